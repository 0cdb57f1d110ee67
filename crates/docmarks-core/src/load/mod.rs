// ── Single-flight load controller ──
//
// Owns one fetch lifecycle: Ready -> Loading -> Loaded | Failed, with
// `load()` able to restart from any state. Completions come back as
// messages tagged with the epoch of the fetch that produced them; only
// the current epoch may change state or reach the sink.

mod state;

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{CoreError, RepositoryError};
use crate::model::DocumentId;

pub use state::{LoadHandle, LoadPhase, LoadState};

/// Starts one fetch. Called once per `load()`.
pub type FetchFn<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<T>, RepositoryError>> + Send + Sync>;

/// Receives the values of a successful fetch.
pub type DeliverFn<T> = Box<dyn FnMut(Vec<T>) + Send>;

/// Result of a fetch, marshalled back to the controller's owner.
pub struct Completion<T> {
    pub epoch: u64,
    pub result: Result<Vec<T>, RepositoryError>,
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("epoch", &self.epoch)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// What [`LoadController::complete`] did with a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Values were handed to the sink.
    Delivered { count: usize },
    /// The fetch failed; state is now `Failed`.
    Failed,
    /// Superseded or unexpected completion; nothing changed.
    Stale,
}

/// Generic single-flight load state machine.
///
/// All methods take `&mut self`: the controller is meant to be owned by
/// exactly one task, which also drains the completion channel handed to
/// [`new`](Self::new) and feeds each message to
/// [`complete`](Self::complete). Fetches run on spawned tasks and never
/// touch controller state directly.
pub struct LoadController<T: Send + 'static> {
    document: DocumentId,
    fetch: FetchFn<T>,
    deliver: DeliverFn<T>,
    completions: mpsc::UnboundedSender<Completion<T>>,
    state: LoadState,
    epoch: u64,
    phase: watch::Sender<LoadPhase>,
}

impl<T: Send + 'static> LoadController<T> {
    pub fn new(
        document: DocumentId,
        fetch: FetchFn<T>,
        deliver: DeliverFn<T>,
        completions: mpsc::UnboundedSender<Completion<T>>,
    ) -> Self {
        let (phase, _) = watch::channel(LoadPhase::Ready);
        Self {
            document,
            fetch,
            deliver,
            completions,
            state: LoadState::Ready,
            epoch: 0,
            phase,
        }
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Epoch of the most recently started fetch (0 before the first).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase.borrow().clone()
    }

    /// Subscribe to phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<LoadPhase> {
        self.phase.subscribe()
    }

    /// Start a new fetch regardless of the current state.
    ///
    /// Any in-flight fetch is superseded: its handle is dropped (which
    /// cancels its task) and its epoch no longer matches, so a late
    /// completion is ignored. Returns the new epoch.
    pub fn load(&mut self) -> u64 {
        self.epoch += 1;
        let epoch = self.epoch;
        let token = CancellationToken::new();

        let fetch = (self.fetch)();
        let completions = self.completions.clone();
        let cancelled = token.clone();
        let document = self.document.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancelled.cancelled() => {
                    trace!(%document, epoch, "fetch cancelled before completion");
                }
                result = fetch => {
                    // Owner gone means the view was torn down; nothing to do.
                    let _ = completions.send(Completion { epoch, result });
                }
            }
        });

        if self.state.is_loading() {
            debug!(document = %self.document, epoch, "superseding in-flight fetch");
        }
        self.state = LoadState::Loading(LoadHandle::new(epoch, token));
        self.publish();
        debug!(document = %self.document, epoch, "fetch started");
        epoch
    }

    /// Start a fetch only when nothing has been started yet.
    ///
    /// `Loaded` and `Failed` are left alone; refreshing or retrying
    /// takes an explicit [`load`](Self::load). Returns whether a fetch
    /// was started.
    pub fn load_if_needed(&mut self) -> bool {
        if self.state.is_ready() {
            self.load();
            true
        } else {
            trace!(document = %self.document, phase = self.phase().name(), "load not needed");
            false
        }
    }

    /// Apply a completion produced by a fetch task.
    pub fn complete(&mut self, completion: Completion<T>) -> CompletionOutcome {
        if completion.epoch != self.epoch || !self.state.is_loading() {
            debug!(
                document = %self.document,
                epoch = completion.epoch,
                current = self.epoch,
                "dropping stale completion"
            );
            return CompletionOutcome::Stale;
        }

        match completion.result {
            Ok(values) => {
                let count = values.len();
                (self.deliver)(values);
                self.state = LoadState::Loaded;
                self.publish();
                debug!(document = %self.document, epoch = self.epoch, count, "fetch delivered");
                CompletionOutcome::Delivered { count }
            }
            Err(source) => {
                let error = CoreError::FetchFailed {
                    document: self.document.clone(),
                    source,
                };
                debug!(document = %self.document, epoch = self.epoch, error = %error, "fetch failed");
                self.state = LoadState::Failed(error);
                self.publish();
                CompletionOutcome::Failed
            }
        }
    }

    fn publish(&self) {
        // `send_replace` updates even with zero receivers.
        self.phase
            .send_replace(LoadPhase::of(&self.state, self.epoch));
    }
}
