// ── Command API ──
//
// Every operation on a collection view flows through this enum. The
// view's actor task is the only consumer, so commands are applied one
// at a time in arrival order.

use std::collections::BTreeSet;

use crate::model::ItemId;

/// A command envelope sent through the view's command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<CommandResult>,
}

/// Imperative operations a UI issues against a collection view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a fresh fetch, superseding any in flight.
    Load,
    /// Start a fetch only if none has ever been started.
    LoadIfNeeded,
    /// Optimistically remove the items at these positions.
    RemoveAt(BTreeSet<usize>),
}

impl Command {
    pub fn remove_at(positions: impl IntoIterator<Item = usize>) -> Self {
        Self::RemoveAt(positions.into_iter().collect())
    }
}

/// Acknowledgement returned once the actor has applied a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// A fetch was started with this epoch.
    LoadStarted { epoch: u64 },
    /// `LoadIfNeeded` found a fetch already started or settled.
    LoadSkipped,
    /// These items were removed from the published list; remote
    /// removal has been requested for each.
    Removed { ids: Vec<ItemId> },
}
