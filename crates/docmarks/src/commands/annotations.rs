//! Annotation command handlers.

use std::sync::Arc;

use tabled::Tabled;

use docmarks_core::Annotation;

use crate::cli::CollectionArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::fixture::Library;

use super::collection;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AnnotationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Page")]
    page: u32,
    #[tabled(rename = "Style")]
    style: String,
    #[tabled(rename = "Quote")]
    quote: String,
    #[tabled(rename = "Comment")]
    comment: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&Arc<Annotation>> for AnnotationRow {
    fn from(a: &Arc<Annotation>) -> Self {
        Self {
            id: a.id.to_string(),
            page: a.page + 1,
            style: a.style.to_string(),
            quote: a.quote.clone().unwrap_or_default(),
            comment: a.comment.clone().unwrap_or_default(),
            created: a.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    library: &Library,
    args: CollectionArgs,
    settings: &Settings,
) -> Result<(), CliError> {
    collection::handle(
        Arc::clone(&library.annotations),
        args.command,
        settings,
        |a| AnnotationRow::from(a),
    )
    .await
}
