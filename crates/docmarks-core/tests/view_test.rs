#![allow(clippy::unwrap_used)]
// Integration tests for `CollectionView` driven by a repository whose
// fetches and removals resolve on test command.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use tokio::sync::{oneshot, watch};
use tokio::time::timeout;

use docmarks_core::{
    Annotation, AnnotationStyle, Bookmark, CollectionRepository, CollectionView, CoreError,
    DocumentId, ItemId, LoadPhase, MemoryRepository, RepositoryError, ViewConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(5);

type FetchResult = Result<Vec<Bookmark>, RepositoryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalMode {
    Succeed,
    Fail,
    Hang,
}

/// Repository whose fetches park until `release` is called.
struct GatedRepository {
    gates: Mutex<Vec<Option<oneshot::Sender<FetchResult>>>>,
    started: watch::Sender<usize>,
    removal_mode: Mutex<RemovalMode>,
    removals: AtomicUsize,
}

impl GatedRepository {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            gates: Mutex::new(Vec::new()),
            started: watch::channel(0).0,
            removal_mode: Mutex::new(RemovalMode::Succeed),
            removals: AtomicUsize::new(0),
        })
    }

    fn set_removal_mode(&self, mode: RemovalMode) {
        *self.removal_mode.lock().unwrap() = mode;
    }

    fn fetches_started(&self) -> usize {
        *self.started.borrow()
    }

    fn removals_started(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    async fn wait_for_fetches(&self, count: usize) {
        let mut rx = self.started.subscribe();
        timeout(WAIT, rx.wait_for(|n| *n >= count))
            .await
            .unwrap()
            .unwrap();
    }

    /// Resolve the `index`-th fetch (0-based, in start order). Returns
    /// whether anybody was still waiting for it.
    fn release(&self, index: usize, result: FetchResult) -> bool {
        let gate = self.gates.lock().unwrap()[index].take().unwrap();
        gate.send(result).is_ok()
    }
}

impl CollectionRepository for GatedRepository {
    type Item = Bookmark;

    fn fetch_all(&self, _document: &DocumentId) -> impl Future<Output = FetchResult> + Send {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push(Some(tx));
        self.started.send_modify(|n| *n += 1);
        async move {
            rx.await.unwrap_or_else(|_| {
                Err(RepositoryError::Unavailable {
                    message: "gate dropped".into(),
                })
            })
        }
    }

    fn remove(&self, id: &ItemId) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.removals.fetch_add(1, Ordering::SeqCst);
        let mode = *self.removal_mode.lock().unwrap();
        let id = id.clone();
        async move {
            match mode {
                RemovalMode::Succeed => Ok(()),
                RemovalMode::Fail => Err(RepositoryError::Rejected {
                    message: format!("cannot remove {id}"),
                }),
                RemovalMode::Hang => std::future::pending().await,
            }
        }
    }
}

fn doc() -> DocumentId {
    DocumentId::from("handbook.pdf")
}

fn bookmark(id: &str) -> Bookmark {
    Bookmark {
        id: ItemId::from(id),
        document: doc(),
        page: 0,
        title: Some(id.to_uppercase()),
        created_at: Utc::now(),
    }
}

fn bookmarks(ids: &[&str]) -> Vec<Bookmark> {
    ids.iter().map(|id| bookmark(id)).collect()
}

fn ids_of(view: &CollectionView<GatedRepository>) -> Vec<String> {
    view.snapshot().iter().map(|b| b.id.to_string()).collect()
}

fn view_with(repo: &Arc<GatedRepository>, config: ViewConfig) -> CollectionView<GatedRepository> {
    CollectionView::new(Arc::clone(repo), doc(), config)
}

/// A view that has already loaded `ids`.
async fn loaded_view(
    repo: &Arc<GatedRepository>,
    config: ViewConfig,
    ids: &[&str],
) -> CollectionView<GatedRepository> {
    let view = view_with(repo, config);
    let index = repo.fetches_started();
    view.load().await.unwrap();
    repo.wait_for_fetches(index + 1).await;
    repo.release(index, Ok(bookmarks(ids)));
    let phase = timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert!(phase.is_loaded());
    view
}

async fn settle_background() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// ── Loading ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_starts_ready_and_empty() {
    let repo = GatedRepository::new();
    let view = view_with(&repo, ViewConfig::default());

    assert!(view.phase().is_ready());
    assert!(view.snapshot().is_empty());
    assert_eq!(view.document(), &doc());
    settle_background().await;
    assert_eq!(repo.fetches_started(), 0);
}

#[tokio::test]
async fn test_repeated_load_if_needed_starts_one_fetch() {
    let repo = GatedRepository::new();
    let view = view_with(&repo, ViewConfig::default());

    assert!(view.load_if_needed().await.unwrap());
    for _ in 0..4 {
        assert!(!view.load_if_needed().await.unwrap());
    }

    repo.wait_for_fetches(1).await;
    settle_background().await;
    assert_eq!(repo.fetches_started(), 1);
    assert!(view.phase().is_loading());
}

#[tokio::test]
async fn test_successful_fetch_replaces_list_in_order() {
    let repo = GatedRepository::new();
    let view = view_with(&repo, ViewConfig::default());

    assert!(view.load_if_needed().await.unwrap());
    assert!(view.phase().is_loading());

    repo.wait_for_fetches(1).await;
    repo.release(0, Ok(bookmarks(&["x", "y"])));
    let phase = timeout(WAIT, view.settled()).await.unwrap().unwrap();

    assert!(matches!(phase, LoadPhase::Loaded { epoch: 1 }));
    assert_eq!(ids_of(&view), ["x", "y"]);

    // Already loaded: a second trigger is a no-op.
    assert!(!view.load_if_needed().await.unwrap());
    settle_background().await;
    assert_eq!(repo.fetches_started(), 1);
    assert!(view.phase().is_loaded());
}

#[tokio::test]
async fn test_reload_discards_local_edits() {
    let repo = GatedRepository::new();
    let view = loaded_view(&repo, ViewConfig::default(), &["a", "b", "c"]).await;

    view.remove_at([0]).await.unwrap();
    assert_eq!(ids_of(&view), ["b", "c"]);

    view.load().await.unwrap();
    repo.wait_for_fetches(2).await;
    repo.release(1, Ok(bookmarks(&["a", "b", "c", "d"])));
    timeout(WAIT, view.settled()).await.unwrap().unwrap();

    assert_eq!(ids_of(&view), ["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_failed_fetch_keeps_list_and_records_error() {
    let repo = GatedRepository::new();
    let view = loaded_view(&repo, ViewConfig::default(), &["a", "b"]).await;

    let epoch = view.load().await.unwrap();
    assert_eq!(epoch, 2);
    repo.wait_for_fetches(2).await;
    repo.release(
        1,
        Err(RepositoryError::Unavailable {
            message: "offline".into(),
        }),
    );
    let phase = timeout(WAIT, view.settled()).await.unwrap().unwrap();

    assert!(matches!(phase, LoadPhase::Failed { epoch: 2, .. }));
    assert_eq!(ids_of(&view), ["a", "b"]);
    assert!(matches!(
        view.last_error(),
        Some(CoreError::FetchFailed {
            source: RepositoryError::Unavailable { .. },
            ..
        })
    ));

    // Failed is not retried implicitly; an explicit load recovers.
    assert!(!view.load_if_needed().await.unwrap());
    view.load().await.unwrap();
    repo.wait_for_fetches(3).await;
    repo.release(2, Ok(bookmarks(&["c"])));
    let phase = timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert!(phase.is_loaded());
    assert!(view.last_error().is_none());
    assert_eq!(ids_of(&view), ["c"]);
}

#[tokio::test]
async fn test_superseded_fetch_never_reaches_list() {
    let repo = GatedRepository::new();
    let view = view_with(&repo, ViewConfig::default());

    let first = view.load().await.unwrap();
    repo.wait_for_fetches(1).await;
    let second = view.load().await.unwrap();
    repo.wait_for_fetches(2).await;
    assert_eq!((first, second), (1, 2));

    // Resolving the superseded fetch changes nothing.
    repo.release(0, Ok(bookmarks(&["stale"])));
    settle_background().await;
    assert!(matches!(view.phase(), LoadPhase::Loading { epoch: 2 }));
    assert!(view.snapshot().is_empty());

    repo.release(1, Ok(bookmarks(&["fresh"])));
    let phase = timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert!(matches!(phase, LoadPhase::Loaded { epoch: 2 }));
    assert_eq!(ids_of(&view), ["fresh"]);
}

#[tokio::test]
async fn test_settled_on_untouched_view_returns_ready() {
    let repo = GatedRepository::new();
    let view = view_with(&repo, ViewConfig::default());

    let phase = timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert!(phase.is_ready());
    assert_eq!(repo.fetches_started(), 0);
}

#[tokio::test]
async fn test_items_stream_observes_delivery_with_phase() {
    let repo = GatedRepository::new();
    let view = view_with(&repo, ViewConfig::default());
    let mut items = view.items();
    assert!(items.current().items.is_empty());
    assert!(items.current().phase.is_ready());

    view.load_if_needed().await.unwrap();
    repo.wait_for_fetches(1).await;
    let state = items.changed().await.unwrap();
    assert!(state.is_pending());

    repo.release(0, Ok(bookmarks(&["p", "q"])));
    let state = timeout(WAIT, async {
        loop {
            let state = items.changed().await.unwrap();
            if state.phase.is_settled() {
                break state;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(state.items.len(), 2);
    assert!(state.phase.is_loaded());
    assert_eq!(items.latest().items.len(), 2);
}

#[tokio::test]
async fn test_items_stream_flags_stale_list_after_failed_reload() {
    let repo = GatedRepository::new();
    let view = loaded_view(&repo, ViewConfig::default(), &["a"]).await;
    let mut items = view.items();

    view.load().await.unwrap();
    repo.wait_for_fetches(2).await;
    repo.release(
        1,
        Err(RepositoryError::Unavailable {
            message: "offline".into(),
        }),
    );
    timeout(WAIT, view.settled()).await.unwrap().unwrap();

    let state = items.changed().await.unwrap();
    assert!(state.is_stale());
    assert_eq!(state.items.len(), 1);
}

// ── Optimistic removal ──────────────────────────────────────────────

#[tokio::test]
async fn test_remove_at_is_visible_before_remote_completes() {
    let repo = GatedRepository::new();
    repo.set_removal_mode(RemovalMode::Hang);
    let view = loaded_view(&repo, ViewConfig::default(), &["a", "b", "c"]).await;

    let removed = view.remove_at([1]).await.unwrap();

    assert_eq!(removed, vec![ItemId::from("b")]);
    assert_eq!(ids_of(&view), ["a", "c"]);
}

#[tokio::test]
async fn test_remove_at_non_contiguous_positions() {
    let repo = GatedRepository::new();
    let view = loaded_view(&repo, ViewConfig::default(), &["a", "b", "c", "d"]).await;

    let removed = view.remove_at([2, 0]).await.unwrap();

    assert_eq!(removed, vec![ItemId::from("a"), ItemId::from("c")]);
    assert_eq!(ids_of(&view), ["b", "d"]);
    settle_background().await;
    assert_eq!(repo.removals_started(), 2);
}

#[tokio::test]
async fn test_failed_remote_removal_keeps_local_removal() {
    let repo = GatedRepository::new();
    repo.set_removal_mode(RemovalMode::Fail);
    let view = loaded_view(&repo, ViewConfig::default(), &["a", "b", "c"]).await;

    let removed = view.remove_at([1]).await;
    assert!(removed.is_ok());

    settle_background().await;
    assert_eq!(repo.removals_started(), 1);
    assert_eq!(ids_of(&view), ["a", "c"]);
    assert!(view.phase().is_loaded());
}

#[tokio::test]
async fn test_out_of_range_positions_are_ignored() {
    let repo = GatedRepository::new();
    let view = loaded_view(&repo, ViewConfig::default(), &["a", "b", "c"]).await;

    let removed = view.remove_at([1, 9]).await.unwrap();
    assert_eq!(removed, vec![ItemId::from("b")]);
    assert_eq!(ids_of(&view), ["a", "c"]);

    let removed = view.remove_at([42]).await.unwrap();
    assert!(removed.is_empty());
    assert_eq!(ids_of(&view), ["a", "c"]);
}

#[tokio::test]
async fn test_remove_before_load_is_a_no_op() {
    let repo = GatedRepository::new();
    let view = view_with(&repo, ViewConfig::default());

    assert!(view.remove_at([0]).await.unwrap().is_empty());
    settle_background().await;
    assert_eq!(repo.removals_started(), 0);
}

#[tokio::test]
async fn test_inflight_load_can_restore_pending_removal() {
    let repo = GatedRepository::new();
    repo.set_removal_mode(RemovalMode::Hang);
    let view = loaded_view(&repo, ViewConfig::default(), &["a", "b", "c"]).await;

    view.load().await.unwrap();
    repo.wait_for_fetches(2).await;
    view.remove_at([1]).await.unwrap();
    assert_eq!(ids_of(&view), ["a", "c"]);

    // The backend still holds "b" when the fetch resolves.
    repo.release(1, Ok(bookmarks(&["a", "b", "c"])));
    timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert_eq!(ids_of(&view), ["a", "b", "c"]);
}

#[tokio::test]
async fn test_masking_hides_pending_removals_from_reload() {
    let repo = GatedRepository::new();
    repo.set_removal_mode(RemovalMode::Hang);
    let config = ViewConfig {
        mask_pending_removals: true,
        ..ViewConfig::default()
    };
    let view = loaded_view(&repo, config, &["a", "b", "c"]).await;

    view.load().await.unwrap();
    repo.wait_for_fetches(2).await;
    view.remove_at([1]).await.unwrap();

    repo.release(1, Ok(bookmarks(&["a", "b", "c"])));
    timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert_eq!(ids_of(&view), ["a", "c"]);
}

#[tokio::test]
async fn test_confirmed_removal_stays_masked_from_older_fetch() {
    let repo = GatedRepository::new();
    let config = ViewConfig {
        mask_pending_removals: true,
        ..ViewConfig::default()
    };
    let view = loaded_view(&repo, config, &["a", "b", "c"]).await;

    // Fetch 2 starts while "b" is still on the backend.
    view.load().await.unwrap();
    repo.wait_for_fetches(2).await;
    view.remove_at([1]).await.unwrap();
    settle_background().await;
    assert_eq!(repo.removals_started(), 1);

    // The delete has been confirmed, but fetch 2 predates it.
    repo.release(1, Ok(bookmarks(&["a", "b", "c"])));
    timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert_eq!(ids_of(&view), ["a", "c"]);

    // A fetch started after confirmation ends the masking.
    view.load().await.unwrap();
    repo.wait_for_fetches(3).await;
    repo.release(2, Ok(bookmarks(&["a", "c"])));
    timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert_eq!(ids_of(&view), ["a", "c"]);

    // So an item recreated under the same id shows up again.
    view.load().await.unwrap();
    repo.wait_for_fetches(4).await;
    repo.release(3, Ok(bookmarks(&["a", "b", "c"])));
    timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert_eq!(ids_of(&view), ["a", "b", "c"]);
}

#[tokio::test]
async fn test_failed_removal_is_unmasked() {
    let repo = GatedRepository::new();
    repo.set_removal_mode(RemovalMode::Fail);
    let config = ViewConfig {
        mask_pending_removals: true,
        ..ViewConfig::default()
    };
    let view = loaded_view(&repo, config, &["a", "b"]).await;

    view.remove_at([0]).await.unwrap();
    settle_background().await;
    assert_eq!(ids_of(&view), ["b"]);

    // The backend kept "a", and a reload shows it.
    view.load().await.unwrap();
    repo.wait_for_fetches(2).await;
    repo.release(1, Ok(bookmarks(&["a", "b"])));
    timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert_eq!(ids_of(&view), ["a", "b"]);
}

#[tokio::test]
async fn test_delete_concurrency_limits_inflight_removals() {
    let repo = GatedRepository::new();
    repo.set_removal_mode(RemovalMode::Hang);
    let config = ViewConfig {
        delete_concurrency: 2,
        ..ViewConfig::default()
    };
    let view = loaded_view(&repo, config, &["a", "b", "c", "d", "e"]).await;

    let removed = view.remove_at(0..5).await.unwrap();
    assert_eq!(removed.len(), 5);
    assert!(view.snapshot().is_empty());

    settle_background().await;
    assert_eq!(repo.removals_started(), 2);
}

#[tokio::test]
async fn test_zero_delete_concurrency_is_unbounded() {
    let repo = GatedRepository::new();
    repo.set_removal_mode(RemovalMode::Hang);
    let config = ViewConfig {
        delete_concurrency: 0,
        ..ViewConfig::default()
    };
    let view = loaded_view(&repo, config, &["a", "b", "c", "d", "e"]).await;

    view.remove_at(0..5).await.unwrap();
    settle_background().await;
    assert_eq!(repo.removals_started(), 5);
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_shutdown_cancels_inflight_fetch() {
    let repo = GatedRepository::new();
    let view = view_with(&repo, ViewConfig::default());

    view.load().await.unwrap();
    repo.wait_for_fetches(1).await;
    timeout(WAIT, view.shutdown()).await.unwrap();
    settle_background().await;

    assert!(!repo.release(0, Ok(bookmarks(&["late"]))));
    assert!(view.snapshot().is_empty());
    assert!(matches!(view.load().await, Err(CoreError::ViewClosed)));
    assert!(matches!(view.remove_at([0]).await, Err(CoreError::ViewClosed)));
    assert!(view.is_closed());

    // Idempotent.
    timeout(WAIT, view.shutdown()).await.unwrap();
}

#[tokio::test]
async fn test_dropping_last_handle_stops_the_view() {
    let repo = GatedRepository::new();
    let view = view_with(&repo, ViewConfig::default());
    let mut items = view.items();
    let clone = view.clone();

    drop(view);
    assert!(!clone.is_closed());
    drop(clone);

    assert!(timeout(WAIT, items.changed()).await.unwrap().is_none());
}

// ── Memory repository end to end ────────────────────────────────────

fn annotation(page: u32, quote: &str) -> Annotation {
    Annotation {
        id: ItemId::new_v4(),
        document: doc(),
        page,
        style: AnnotationStyle::Highlight,
        quote: Some(quote.into()),
        comment: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_memory_repository_round_trip() {
    let repo = Arc::new(MemoryRepository::new());
    repo.seed(
        doc(),
        vec![
            annotation(1, "first"),
            annotation(2, "second"),
            annotation(3, "third"),
        ],
    );
    let view = CollectionView::new(Arc::clone(&repo), doc(), ViewConfig::default());

    view.load_if_needed().await.unwrap();
    timeout(WAIT, view.settled()).await.unwrap().unwrap();
    assert_eq!(view.snapshot().len(), 3);

    let removed = view.remove_at([1]).await.unwrap();
    assert_eq!(removed.len(), 1);

    timeout(WAIT, async {
        while repo.contains(&removed[0]) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    view.load().await.unwrap();
    timeout(WAIT, view.settled()).await.unwrap().unwrap();
    let quotes: Vec<_> = view
        .snapshot()
        .iter()
        .map(|a| a.quote.clone().unwrap())
        .collect();
    assert_eq!(quotes, ["first", "third"]);
    assert_eq!(repo.fetch_count(), 2);
}

#[tokio::test]
async fn test_memory_repository_fetch_failure_is_observable() {
    let repo: Arc<MemoryRepository<Annotation>> = Arc::new(MemoryRepository::new());
    repo.fail_fetches(true);
    let view = CollectionView::new(Arc::clone(&repo), doc(), ViewConfig::default());

    view.load_if_needed().await.unwrap();
    let phase = timeout(WAIT, view.settled()).await.unwrap().unwrap();

    assert!(phase.is_failed());
    let error = phase.error().unwrap();
    assert!(error.to_string().contains("handbook.pdf"));
}
