// ── Load lifecycle states ──
//
// `LoadState` is what the controller owns (including the in-flight
// handle). `LoadPhase` is the cloneable projection published to
// observers.

use strum::IntoStaticStr;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::CoreError;

/// Ownership token for one in-flight fetch.
///
/// Dropping the handle cancels the fetch task, so replacing a
/// `Loading` state is enough to silence the superseded operation.
#[derive(Debug)]
pub struct LoadHandle {
    epoch: u64,
    token: CancellationToken,
    _guard: DropGuard,
}

impl LoadHandle {
    pub(crate) fn new(epoch: u64, token: CancellationToken) -> Self {
        let guard = token.clone().drop_guard();
        Self {
            epoch,
            token,
            _guard: guard,
        }
    }

    /// Epoch of the fetch this handle owns.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// A token observers can wait on; cancelled once the handle drops.
    pub fn cancellation(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Lifecycle of a single-flight load. Exactly one variant holds.
#[derive(Debug, Default)]
pub enum LoadState {
    /// Nothing started yet.
    #[default]
    Ready,
    /// A fetch is in flight; the handle is owned by this value.
    Loading(LoadHandle),
    /// Last fetch succeeded and its values were delivered.
    Loaded,
    /// Last fetch failed; values were not delivered.
    Failed(CoreError),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }
}

/// Observable projection of [`LoadState`].
///
/// Every phase past `Ready` carries the epoch of the fetch it refers
/// to, so observers can tell two consecutive loads apart.
#[derive(Debug, Clone, Default, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum LoadPhase {
    #[default]
    Ready,
    Loading {
        epoch: u64,
    },
    Loaded {
        epoch: u64,
    },
    Failed {
        epoch: u64,
        error: CoreError,
    },
}

impl LoadPhase {
    pub(crate) fn of(state: &LoadState, epoch: u64) -> Self {
        match state {
            LoadState::Ready => Self::Ready,
            LoadState::Loading(handle) => Self::Loading {
                epoch: handle.epoch(),
            },
            LoadState::Loaded => Self::Loaded { epoch },
            LoadState::Failed(error) => Self::Failed {
                epoch,
                error: error.clone(),
            },
        }
    }

    /// Short lowercase name, for logs and status lines.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn epoch(&self) -> Option<u64> {
        match self {
            Self::Ready => None,
            Self::Loading { epoch } | Self::Loaded { epoch } | Self::Failed { epoch, .. } => {
                Some(*epoch)
            }
        }
    }

    pub fn error(&self) -> Option<&CoreError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// `Loaded` or `Failed`.
    pub fn is_settled(&self) -> bool {
        self.is_loaded() || self.is_failed()
    }
}
