//! Reactive, single-flight collection views for document annotations and
//! bookmarks.
//!
//! This crate sits between a data-access layer and a UI:
//!
//! - **[`LoadController`]**: Generic load state machine
//!   (`Ready` / `Loading` / `Loaded` / `Failed`). At most one fetch is
//!   meaningful at a time: every fetch carries an epoch, superseded
//!   fetches are cancelled, and stale completions are dropped before they
//!   reach the sink.
//!
//! - **[`CollectionView`]**: Per-document façade generic over a
//!   [`CollectionRepository`]. Owns a `LoadController` and the published
//!   list inside a single actor task, so every mutation is serialized by
//!   construction. Supports [`load`](CollectionView::load),
//!   [`load_if_needed`](CollectionView::load_if_needed) and optimistic
//!   [`remove_at`](CollectionView::remove_at).
//!
//! - **[`ListStream<T>`]**: Subscription handle yielding the published
//!   list together with its [`LoadPhase`], so a renderer can show
//!   loading, empty and failed states from one source.
//!
//! - **[`MemoryRepository`]**: Concurrent in-memory repository with
//!   latency and failure injection.
//!
//! - **Domain model** ([`model`]): [`Annotation`], [`Bookmark`] and the
//!   [`ItemId`] / [`DocumentId`] identifiers.

pub mod command;
pub mod config;
pub mod error;
pub mod load;
pub mod model;
pub mod repository;
pub mod stream;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::ViewConfig;
pub use error::{CoreError, RepositoryError};
pub use load::{
    Completion, CompletionOutcome, DeliverFn, FetchFn, LoadController, LoadHandle, LoadPhase,
    LoadState,
};
pub use repository::{CollectionItem, CollectionRepository, MemoryRepository};
pub use stream::{ListSnapshot, ListState, ListStream, ListUpdates};
pub use view::CollectionView;

pub use model::{Annotation, AnnotationStyle, Bookmark, DocumentId, ItemId};

