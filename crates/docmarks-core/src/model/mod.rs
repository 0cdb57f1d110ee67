// ── Domain model ──
//
// Item types shown in document side panels, plus the identifiers the
// view layer keys them by.

pub mod annotation;
pub mod bookmark;
pub mod ids;

// ── Re-exports ──────────────────────────────────────────────────────

pub use annotation::{Annotation, AnnotationStyle};
pub use bookmark::Bookmark;
pub use ids::{DocumentId, ItemId};
