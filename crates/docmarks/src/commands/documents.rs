//! Document listing.

use serde::Serialize;
use tabled::Tabled;

use crate::config::Settings;
use crate::fixture::Library;
use crate::output;

#[derive(Debug, Clone, Serialize, Tabled)]
struct DocumentRow {
    #[tabled(rename = "Document")]
    document: String,
    #[tabled(rename = "Annotations")]
    annotations: usize,
    #[tabled(rename = "Bookmarks")]
    bookmarks: usize,
}

pub fn handle(library: &Library, settings: &Settings) {
    let rows: Vec<DocumentRow> = library
        .documents()
        .into_iter()
        .map(|doc| DocumentRow {
            annotations: library.annotations.items(&doc).len(),
            bookmarks: library.bookmarks.items(&doc).len(),
            document: doc.to_string(),
        })
        .collect();

    let out = output::render_list(settings.output, &rows, DocumentRow::clone, |r| {
        r.document.clone()
    });
    output::print_output(&out, settings.quiet);
}
