//! Command dispatch: bridges CLI args -> collection views -> output formatting.

pub mod annotations;
pub mod bookmarks;
pub mod collection;
pub mod documents;

use crate::cli::Command;
use crate::config::Settings;
use crate::error::CliError;
use crate::fixture::Library;

/// Dispatch a fixture-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    library: &Library,
    settings: &Settings,
) -> Result<(), CliError> {
    match cmd {
        Command::Annotations(args) => annotations::handle(library, args, settings).await,
        Command::Bookmarks(args) => bookmarks::handle(library, args, settings).await,
        Command::Documents => {
            documents::handle(library, settings);
            Ok(())
        }
        // Completions is handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
