// ── In-memory repository ──
//
// Concurrent map of document -> ordered items. Backs the CLI and the
// test suites; supports simulated latency and failure injection.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tracing::trace;

use super::{CollectionItem, CollectionRepository};
use crate::error::RepositoryError;
use crate::model::{DocumentId, ItemId};

/// A lock-free, in-memory [`CollectionRepository`].
///
/// Every call sleeps for the configured latency before touching the
/// map, so reads and removals observe the state at completion time.
pub struct MemoryRepository<T: CollectionItem> {
    by_document: DashMap<DocumentId, Vec<T>>,
    latency: Duration,
    fail_fetches: AtomicBool,
    fail_removals: AtomicBool,
    fetch_count: AtomicUsize,
    remove_count: AtomicUsize,
}

impl<T: CollectionItem> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CollectionItem> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            by_document: DashMap::new(),
            latency: Duration::ZERO,
            fail_fetches: AtomicBool::new(false),
            fail_removals: AtomicBool::new(false),
            fetch_count: AtomicUsize::new(0),
            remove_count: AtomicUsize::new(0),
        }
    }

    /// Delay every fetch and removal by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Append an item to a document's collection.
    pub fn insert(&self, document: DocumentId, item: T) {
        self.by_document.entry(document).or_default().push(item);
    }

    /// Replace a document's collection wholesale.
    pub fn seed(&self, document: DocumentId, items: Vec<T>) {
        self.by_document.insert(document, items);
    }

    /// Make subsequent fetches fail with [`RepositoryError::Unavailable`].
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent removals fail with [`RepositoryError::Rejected`].
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    /// Number of `fetch_all` calls started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Number of `remove` calls started so far.
    pub fn remove_count(&self) -> usize {
        self.remove_count.load(Ordering::SeqCst)
    }

    /// Current items for a document (cloned).
    pub fn items(&self, document: &DocumentId) -> Vec<T> {
        self.by_document
            .get(document)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.by_document
            .iter()
            .any(|r| r.value().iter().any(|item| item.id() == id))
    }

    /// All document keys with at least one stored collection.
    pub fn documents(&self) -> Vec<DocumentId> {
        let mut keys: Vec<DocumentId> = self.by_document.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn remove_now(&self, id: &ItemId) -> bool {
        let mut removed = false;
        for mut entry in self.by_document.iter_mut() {
            let before = entry.value().len();
            entry.value_mut().retain(|item| item.id() != id);
            removed |= entry.value().len() != before;
        }
        removed
    }
}

impl<T: CollectionItem> CollectionRepository for MemoryRepository<T> {
    type Item = T;

    fn fetch_all(
        &self,
        document: &DocumentId,
    ) -> impl Future<Output = Result<Vec<T>, RepositoryError>> + Send {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let document = document.clone();
        async move {
            self.simulate_latency().await;
            if self.fail_fetches.load(Ordering::SeqCst) {
                return Err(RepositoryError::Unavailable {
                    message: format!("fetch for {document} failed (injected)"),
                });
            }
            let items = self.items(&document);
            trace!(%document, count = items.len(), "memory fetch");
            Ok(items)
        }
    }

    fn remove(&self, id: &ItemId) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.remove_count.fetch_add(1, Ordering::SeqCst);
        let id = id.clone();
        async move {
            self.simulate_latency().await;
            if self.fail_removals.load(Ordering::SeqCst) {
                return Err(RepositoryError::Rejected {
                    message: format!("removal of {id} failed (injected)"),
                });
            }
            let removed = self.remove_now(&id);
            trace!(%id, removed, "memory remove");
            Ok(())
        }
    }
}
