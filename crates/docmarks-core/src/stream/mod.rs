// ── Reactive list streams ──
//
// What a renderer subscribes to: the published list paired with the load
// phase it was observed under, so "loading", "failed" and "empty" can be
// told apart without a second subscription.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::sync::watch;

use crate::load::LoadPhase;

/// Snapshot type published by a view: shared, ordered, immutable.
pub type ListSnapshot<T> = Arc<Vec<Arc<T>>>;

/// Stream form of a [`ListStream`].
pub type ListUpdates<T> = BoxStream<'static, ListState<T>>;

/// One observation of a view: its items and where its load stands.
#[derive(Debug)]
pub struct ListState<T> {
    pub items: ListSnapshot<T>,
    pub phase: LoadPhase,
}

impl<T> Clone for ListState<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            phase: self.phase.clone(),
        }
    }
}

impl<T> ListState<T> {
    /// Nothing to show yet because the first fetch has not settled.
    pub fn is_pending(&self) -> bool {
        self.items.is_empty() && !self.phase.is_settled()
    }

    /// A settled load that produced no items. Distinct from a failure.
    pub fn is_empty_result(&self) -> bool {
        self.items.is_empty() && self.phase.is_loaded()
    }

    /// Items are shown, but the last fetch failed; they may be stale.
    pub fn is_stale(&self) -> bool {
        self.phase.is_failed()
    }
}

/// A subscription to a view's list and load phase.
///
/// Wakes on either kind of change. A delivery usually produces one
/// wake for the new items and another for `Loaded`; the pair is already
/// consistent when the second arrives.
pub struct ListStream<T: Send + Sync + 'static> {
    current: ListState<T>,
    items: watch::Receiver<ListSnapshot<T>>,
    phase: watch::Receiver<LoadPhase>,
}

impl<T: Send + Sync + 'static> ListStream<T> {
    pub(crate) fn new(
        mut items: watch::Receiver<ListSnapshot<T>>,
        mut phase: watch::Receiver<LoadPhase>,
    ) -> Self {
        let current = ListState {
            items: items.borrow_and_update().clone(),
            phase: phase.borrow_and_update().clone(),
        };
        Self {
            current,
            items,
            phase,
        }
    }

    /// The state captured at creation time, or at the last `changed()`.
    pub fn current(&self) -> &ListState<T> {
        &self.current
    }

    /// The latest state (may have changed since creation).
    pub fn latest(&self) -> ListState<T> {
        ListState {
            items: self.items.borrow().clone(),
            phase: self.phase.borrow().clone(),
        }
    }

    /// Wait for the next change to the items or the phase.
    /// Returns `None` once the view has shut down.
    pub async fn changed(&mut self) -> Option<ListState<T>> {
        tokio::select! {
            res = self.items.changed() => res.ok()?,
            res = self.phase.changed() => res.ok()?,
        }
        self.current = ListState {
            items: self.items.borrow_and_update().clone(),
            phase: self.phase.borrow_and_update().clone(),
        };
        Some(self.current.clone())
    }

    /// Convert into a `Stream` that yields the current state first, then
    /// one state per change, and ends when the view shuts down.
    pub fn into_stream(self) -> ListUpdates<T> {
        stream::unfold((self, true), |(mut sub, first)| async move {
            let state = if first {
                sub.current.clone()
            } else {
                sub.changed().await?
            };
            Some((state, (sub, false)))
        })
        .boxed()
    }
}
