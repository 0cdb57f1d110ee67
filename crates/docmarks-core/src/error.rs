// ── Core error types ──
//
// `RepositoryError` is what data-access collaborators report.
// `CoreError` is what the load/view layer records or hands back. Fetch
// failures are stored in the load state, delete failures are logged
// and dropped; neither unwinds out of a view entry point.

use thiserror::Error;

use crate::model::{DocumentId, ItemId};

/// Failure reported by a [`CollectionRepository`](crate::CollectionRepository).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Item not found: {id}")]
    NotFound { id: ItemId },

    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("Backend rejected the request: {message}")]
    Rejected { message: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Load errors ──────────────────────────────────────────────────
    #[error("Failed to fetch collection for document {document}: {source}")]
    FetchFailed {
        document: DocumentId,
        #[source]
        source: RepositoryError,
    },

    // ── Removal errors (logged, never surfaced) ──────────────────────
    #[error("Failed to remove item {id}: {source}")]
    DeleteFailed {
        id: ItemId,
        #[source]
        source: RepositoryError,
    },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Collection view has been shut down")]
    ViewClosed,

    /// The actor answered a command with a reply meant for another
    /// command. Indicates a bug in the view, not a caller error.
    #[error("Collection view answered {command} with an unexpected reply")]
    UnexpectedReply { command: &'static str },
}

impl CoreError {
    /// The repository failure underneath a fetch or delete error.
    pub fn repository_error(&self) -> Option<&RepositoryError> {
        match self {
            Self::FetchFailed { source, .. } | Self::DeleteFailed { source, .. } => Some(source),
            Self::ViewClosed | Self::UnexpectedReply { .. } => None,
        }
    }
}
