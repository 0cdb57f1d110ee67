//! Bookmark command handlers.

use std::sync::Arc;

use tabled::Tabled;

use docmarks_core::Bookmark;

use crate::cli::CollectionArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::fixture::Library;

use super::collection;

#[derive(Tabled)]
struct BookmarkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Page")]
    page: u32,
    #[tabled(rename = "Title")]
    title: String,
}

impl From<&Arc<Bookmark>> for BookmarkRow {
    fn from(b: &Arc<Bookmark>) -> Self {
        Self {
            id: b.id.to_string(),
            page: b.page + 1,
            title: b.label(),
        }
    }
}

pub async fn handle(
    library: &Library,
    args: CollectionArgs,
    settings: &Settings,
) -> Result<(), CliError> {
    collection::handle(
        Arc::clone(&library.bookmarks),
        args.command,
        settings,
        |b| BookmarkRow::from(b),
    )
    .await
}
