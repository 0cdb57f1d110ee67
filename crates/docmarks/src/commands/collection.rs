//! Shared list/remove flow for any collection kind.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use docmarks_core::{
    CollectionItem, CollectionRepository, CollectionView, DocumentId, ListSnapshot, LoadPhase,
};

use crate::cli::CollectionCommand;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

/// Open a view on `document` and wait for its first load to settle.
pub async fn open<R>(
    repo: Arc<R>,
    document: &str,
    settings: &Settings,
) -> Result<CollectionView<R>, CliError>
where
    R: CollectionRepository,
{
    let view = CollectionView::new(repo, DocumentId::new(document), settings.view.clone());
    view.load_if_needed().await?;

    if let LoadPhase::Failed { error, .. } = view.settled().await? {
        view.shutdown().await;
        return Err(error.into());
    }
    Ok(view)
}

/// Run a list or remove subcommand against `repo`.
pub async fn handle<R, Row>(
    repo: Arc<R>,
    command: CollectionCommand,
    settings: &Settings,
    to_row: impl Fn(&Arc<R::Item>) -> Row,
) -> Result<(), CliError>
where
    R: CollectionRepository,
    R::Item: Serialize,
    Row: Tabled,
{
    let (view, removed) = match command {
        CollectionCommand::List { document } => (open(repo, &document, settings).await?, None),
        CollectionCommand::Remove { document, indices } => {
            let view = open(repo, &document, settings).await?;
            let ids = view.remove_at(indices).await?;
            debug!(document = %view.document(), count = ids.len(), "removed items");
            (view, Some(ids.len()))
        }
    };

    let items: ListSnapshot<R::Item> = view.snapshot();
    view.shutdown().await;

    if let Some(count) = removed {
        output::print_status(
            &format!("Removed {count} item(s), {} remaining", items.len()),
            settings.quiet,
        );
    }

    let out = output::render_list(settings.output, items.as_slice(), to_row, |item| {
        item.id().to_string()
    });
    output::print_output(&out, settings.quiet);
    Ok(())
}
