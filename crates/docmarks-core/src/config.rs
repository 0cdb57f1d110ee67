// ── Runtime view configuration ──
//
// Tuning knobs for a single collection view. Callers build a
// `ViewConfig` and hand it in; core never reads config files.

const DEFAULT_COMMAND_CHANNEL_SIZE: usize = 64;
const DEFAULT_DELETE_CONCURRENCY: usize = 8;

/// Configuration for one [`CollectionView`](crate::CollectionView).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    /// Capacity of the command queue feeding the view's actor task.
    pub command_channel_size: usize,
    /// Maximum concurrent per-item deletes issued by one `remove_at`.
    /// 0 = unbounded.
    pub delete_concurrency: usize,
    /// When set, a full-replace delivery drops items whose remote
    /// deletion is still in flight. Off by default: a fetch that lands
    /// before the delete completes brings the item back.
    pub mask_pending_removals: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            command_channel_size: DEFAULT_COMMAND_CHANNEL_SIZE,
            delete_concurrency: DEFAULT_DELETE_CONCURRENCY,
            mask_pending_removals: false,
        }
    }
}

impl ViewConfig {
    /// Channel capacity, clamped so `mpsc::channel` never sees zero.
    pub(crate) fn channel_size(&self) -> usize {
        self.command_channel_size.max(1)
    }
}
