// ── Collection view ──
//
// Per-document façade over one collection: owns a LoadController and
// the published list, and removes items optimistically. All state lives
// in a single actor task; handles talk to it through a command channel,
// and fetch/removal tasks report back through completion channels.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ViewConfig;
use crate::error::{CoreError, RepositoryError};
use crate::load::{Completion, CompletionOutcome, DeliverFn, FetchFn, LoadController, LoadPhase};
use crate::model::{DocumentId, ItemId};
use crate::repository::{CollectionItem, CollectionRepository};
use crate::stream::{ListSnapshot, ListStream};

// ── CollectionView ───────────────────────────────────────────────

/// Observable, reloadable list of one document's items.
///
/// Cheaply cloneable via `Arc<ViewInner>`. The actor stops when
/// [`shutdown()`](Self::shutdown) is called or the last clone is
/// dropped; either way the in-flight fetch is cancelled and its result
/// never reaches the list.
pub struct CollectionView<R: CollectionRepository> {
    inner: Arc<ViewInner<R>>,
}

impl<R: CollectionRepository> Clone for CollectionView<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ViewInner<R: CollectionRepository> {
    document: DocumentId,
    config: ViewConfig,
    command_tx: mpsc::Sender<CommandEnvelope>,
    items: watch::Receiver<ListSnapshot<R::Item>>,
    phase: watch::Receiver<LoadPhase>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<R: CollectionRepository> Drop for ViewInner<R> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<R: CollectionRepository> CollectionView<R> {
    /// Bind a view to `document` and spawn its actor.
    ///
    /// Nothing is fetched until [`load_if_needed()`](Self::load_if_needed)
    /// or [`load()`](Self::load). Must be called within a Tokio runtime.
    pub fn new(repo: Arc<R>, document: DocumentId, config: ViewConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.channel_size());
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (removal_tx, removal_rx) = mpsc::unbounded_channel();
        let (items_tx, items_rx) = watch::channel::<ListSnapshot<R::Item>>(Arc::new(Vec::new()));
        let items_tx = Arc::new(items_tx);
        let pending: PendingRemovals = Arc::new(DashMap::new());
        let cancel = CancellationToken::new();

        let controller = LoadController::new(
            document.clone(),
            fetch_fn(&repo, &document),
            deliver_fn(&items_tx, &pending, config.mask_pending_removals),
            completion_tx,
        );
        let phase = controller.subscribe();

        let actor = ViewActor {
            document: document.clone(),
            repo,
            delete_concurrency: config.delete_concurrency,
            mask_pending_removals: config.mask_pending_removals,
            controller,
            items: items_tx,
            pending,
            removal_tx,
        };
        let task = tokio::spawn(view_task(
            actor,
            command_rx,
            completion_rx,
            removal_rx,
            cancel.clone(),
        ));
        debug!(%document, "collection view started");

        Self {
            inner: Arc::new(ViewInner {
                document,
                config,
                command_tx,
                items: items_rx,
                phase,
                cancel,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    /// The document this view is bound to.
    pub fn document(&self) -> &DocumentId {
        &self.inner.document
    }

    pub fn config(&self) -> &ViewConfig {
        &self.inner.config
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Start a fresh fetch, superseding any in flight. Returns the new
    /// fetch epoch. Fetch failures are recorded in [`phase()`](Self::phase),
    /// never returned here.
    pub async fn load(&self) -> Result<u64, CoreError> {
        match self.execute(Command::Load).await? {
            CommandResult::LoadStarted { epoch } => Ok(epoch),
            other => unexpected_reply("load", &other),
        }
    }

    /// Start a fetch only if none has ever been started. Returns whether
    /// a fetch was started.
    pub async fn load_if_needed(&self) -> Result<bool, CoreError> {
        match self.execute(Command::LoadIfNeeded).await? {
            CommandResult::LoadStarted { .. } => Ok(true),
            CommandResult::LoadSkipped => Ok(false),
            other => unexpected_reply("load_if_needed", &other),
        }
    }

    /// Remove the items at `positions` from the published list.
    ///
    /// When this returns the list no longer contains them. Remote
    /// removal runs in the background per item; failures are logged and
    /// the local removal stands. Out-of-range positions are ignored.
    /// Returns the ids that were removed, in position order.
    pub async fn remove_at(
        &self,
        positions: impl IntoIterator<Item = usize>,
    ) -> Result<Vec<ItemId>, CoreError> {
        match self.execute(Command::remove_at(positions)).await? {
            CommandResult::Removed { ids } => Ok(ids),
            other => unexpected_reply("remove_at", &other),
        }
    }

    /// Send a command to the actor and wait until it has been applied.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        let (tx, rx) = oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ViewClosed)?;

        rx.await.map_err(|_| CoreError::ViewClosed)
    }

    // ── Observation ──────────────────────────────────────────────

    /// Subscribe to the published list.
    pub fn items(&self) -> ListStream<R::Item> {
        ListStream::new(self.inner.items.clone(), self.inner.phase.clone())
    }

    /// The published list right now.
    pub fn snapshot(&self) -> ListSnapshot<R::Item> {
        self.inner.items.borrow().clone()
    }

    /// Current load phase.
    pub fn phase(&self) -> LoadPhase {
        self.inner.phase.borrow().clone()
    }

    /// Subscribe to load phase transitions.
    pub fn phase_changes(&self) -> watch::Receiver<LoadPhase> {
        self.inner.phase.clone()
    }

    /// The error of the last fetch, if it failed.
    pub fn last_error(&self) -> Option<CoreError> {
        self.inner.phase.borrow().error().cloned()
    }

    /// Wait until the current fetch settles (`Loaded` or `Failed`) and
    /// return that phase. Returns immediately if already settled, and
    /// returns `Ready` at once on a view that has never started a fetch.
    pub async fn settled(&self) -> Result<LoadPhase, CoreError> {
        let mut phase = self.inner.phase.clone();
        let settled = phase
            .wait_for(|p| p.is_settled() || p.is_ready())
            .await
            .map_err(|_| CoreError::ViewClosed)?;
        Ok(settled.clone())
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Stop the actor and wait for it to exit. Idempotent.
    ///
    /// Any in-flight fetch is cancelled. Background removals already
    /// issued keep running; their outcome is simply not observed.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        info!(document = %self.inner.document, "collection view shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.command_tx.is_closed()
    }
}

fn unexpected_reply<T>(command: &'static str, result: &CommandResult) -> Result<T, CoreError> {
    warn!(command, ?result, "unexpected command reply");
    Err(CoreError::UnexpectedReply { command })
}

// ── Wiring ───────────────────────────────────────────────────────

fn fetch_fn<R: CollectionRepository>(repo: &Arc<R>, document: &DocumentId) -> FetchFn<R::Item> {
    let repo = Arc::clone(repo);
    let document = document.clone();
    Arc::new(move || {
        let repo = Arc::clone(&repo);
        let document = document.clone();
        async move { repo.fetch_all(&document).await }.boxed()
    })
}

/// Ids removed locally whose removal may still be missing from a fetch.
///
/// `None`: the remote delete is in flight. `Some(epoch)`: the delete was
/// confirmed while `epoch` was the newest fetch, so that fetch (or an
/// older one) can still carry the item. Only a delivery from a later
/// epoch proves the backend result no longer has it.
type PendingRemovals = Arc<DashMap<ItemId, Option<u64>>>;

/// Sink for successful fetches: replace the published list wholesale.
fn deliver_fn<T: CollectionItem>(
    items: &Arc<watch::Sender<ListSnapshot<T>>>,
    pending: &PendingRemovals,
    mask_pending_removals: bool,
) -> DeliverFn<T> {
    let items = Arc::clone(items);
    let pending = Arc::clone(pending);
    Box::new(move |values: Vec<T>| {
        let list: Vec<Arc<T>> = values
            .into_iter()
            .filter(|item| !(mask_pending_removals && pending.contains_key(item.id())))
            .map(Arc::new)
            .collect();
        items.send_replace(Arc::new(list));
    })
}

// ── Actor ────────────────────────────────────────────────────────

/// Outcome of one background removal.
struct RemovalSettled {
    id: ItemId,
    result: Result<(), RepositoryError>,
}

/// Exclusive owner of a view's mutable state.
struct ViewActor<R: CollectionRepository> {
    document: DocumentId,
    repo: Arc<R>,
    delete_concurrency: usize,
    mask_pending_removals: bool,
    controller: LoadController<R::Item>,
    items: Arc<watch::Sender<ListSnapshot<R::Item>>>,
    pending: PendingRemovals,
    removal_tx: mpsc::UnboundedSender<RemovalSettled>,
}

impl<R: CollectionRepository> ViewActor<R> {
    fn handle(&mut self, command: Command) -> CommandResult {
        match command {
            Command::Load => CommandResult::LoadStarted {
                epoch: self.controller.load(),
            },
            Command::LoadIfNeeded => {
                if self.controller.load_if_needed() {
                    CommandResult::LoadStarted {
                        epoch: self.controller.epoch(),
                    }
                } else {
                    CommandResult::LoadSkipped
                }
            }
            Command::RemoveAt(positions) => CommandResult::Removed {
                ids: self.remove_at(&positions),
            },
        }
    }

    fn on_completion(&mut self, completion: Completion<R::Item>) {
        let epoch = completion.epoch;
        match self.controller.complete(completion) {
            CompletionOutcome::Delivered { .. } => self.release_confirmed(epoch),
            CompletionOutcome::Failed => {
                // The published list is left exactly as it was.
                if let Some(error) = self.controller.phase().error() {
                    warn!(document = %self.document, %error, "collection fetch failed");
                }
            }
            CompletionOutcome::Stale => {}
        }
    }

    /// Stop masking ids whose delete was confirmed before the fetch at
    /// `delivered` started.
    fn release_confirmed(&self, delivered: u64) {
        self.pending
            .retain(|_, confirmed| !matches!(confirmed, Some(epoch) if *epoch < delivered));
    }

    fn remove_at(&mut self, positions: &BTreeSet<usize>) -> Vec<ItemId> {
        let current = self.items.borrow().clone();

        // Capture ids before touching the list so positions stay valid.
        let mut ids = Vec::with_capacity(positions.len());
        for &position in positions {
            match current.get(position) {
                Some(item) => ids.push(item.id().clone()),
                None => warn!(
                    document = %self.document,
                    position,
                    len = current.len(),
                    "ignoring out-of-range removal position"
                ),
            }
        }
        if ids.is_empty() {
            return ids;
        }

        let remaining: Vec<Arc<R::Item>> = current
            .iter()
            .enumerate()
            .filter(|(position, _)| !positions.contains(position))
            .map(|(_, item)| Arc::clone(item))
            .collect();
        self.items.send_replace(Arc::new(remaining));

        if self.mask_pending_removals {
            for id in &ids {
                self.pending.insert(id.clone(), None);
            }
        }
        debug!(document = %self.document, count = ids.len(), "removed items locally");

        self.spawn_removals(ids.clone());
        ids
    }

    /// Fire one best-effort remote removal per id.
    fn spawn_removals(&self, ids: Vec<ItemId>) {
        let repo = Arc::clone(&self.repo);
        let tx = self.removal_tx.clone();
        let limit = match self.delete_concurrency {
            0 => ids.len(),
            n => n,
        };

        tokio::spawn(async move {
            futures_util::stream::iter(ids)
                .map(|id| {
                    let repo = Arc::clone(&repo);
                    async move {
                        let result = repo.remove(&id).await;
                        RemovalSettled { id, result }
                    }
                })
                .buffer_unordered(limit.max(1))
                .for_each(|settled| {
                    // Owner gone means the view was torn down; nothing to report to.
                    let _ = tx.send(settled);
                    futures_util::future::ready(())
                })
                .await;
        });
    }

    fn on_removal_settled(&mut self, settled: RemovalSettled) {
        match settled.result {
            Ok(()) => {
                // A fetch already in flight may predate the delete; keep
                // masking until a newer one delivers.
                let epoch = self.controller.epoch();
                if let Some(mut confirmed) = self.pending.get_mut(&settled.id) {
                    *confirmed = Some(epoch);
                }
                debug!(document = %self.document, id = %settled.id, "remote removal confirmed");
            }
            Err(source) => {
                // The backend still has the item, so later fetches may show it.
                self.pending.remove(&settled.id);
                let error = CoreError::DeleteFailed {
                    id: settled.id,
                    source,
                };
                debug!(document = %self.document, %error, "remote removal failed, keeping local removal");
            }
        }
    }
}

/// Single consumer of a view's command and completion queues.
async fn view_task<R: CollectionRepository>(
    mut actor: ViewActor<R>,
    mut command_rx: mpsc::Receiver<CommandEnvelope>,
    mut completion_rx: mpsc::UnboundedReceiver<Completion<R::Item>>,
    mut removal_rx: mpsc::UnboundedReceiver<RemovalSettled>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(completion) = completion_rx.recv() => actor.on_completion(completion),
            Some(settled) = removal_rx.recv() => actor.on_removal_settled(settled),
            envelope = command_rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = actor.handle(envelope.command);
                let _ = envelope.response_tx.send(result);
            }
        }
    }
    debug!(document = %actor.document, "collection view stopped");
}
