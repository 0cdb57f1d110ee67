//! JSON fixture loading into in-memory repositories.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use docmarks_core::{Annotation, Bookmark, DocumentId, MemoryRepository};

use crate::error::CliError;

/// On-disk fixture shape.
#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    annotations: Vec<Annotation>,
    #[serde(default)]
    bookmarks: Vec<Bookmark>,
}

/// The repositories commands open views against.
pub struct Library {
    pub annotations: Arc<MemoryRepository<Annotation>>,
    pub bookmarks: Arc<MemoryRepository<Bookmark>>,
}

impl Library {
    /// Read a fixture file and populate both repositories, keeping the
    /// file's order within each document.
    pub fn load(path: &Path, latency: Duration) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CliError::FixtureIo {
            path: path.display().to_string(),
            source,
        })?;
        let fixture: Fixture =
            serde_json::from_str(&raw).map_err(|source| CliError::FixtureJson {
                path: path.display().to_string(),
                source,
            })?;

        debug!(
            path = %path.display(),
            annotations = fixture.annotations.len(),
            bookmarks = fixture.bookmarks.len(),
            "fixture loaded"
        );
        Ok(Self::from_fixture(fixture, latency))
    }

    fn from_fixture(fixture: Fixture, latency: Duration) -> Self {
        let annotations = MemoryRepository::new().with_latency(latency);
        for item in fixture.annotations {
            annotations.insert(item.document.clone(), item);
        }
        let bookmarks = MemoryRepository::new().with_latency(latency);
        for item in fixture.bookmarks {
            bookmarks.insert(item.document.clone(), item);
        }
        Self {
            annotations: Arc::new(annotations),
            bookmarks: Arc::new(bookmarks),
        }
    }

    /// Every document with annotations or bookmarks, sorted.
    pub fn documents(&self) -> Vec<DocumentId> {
        let mut docs = self.annotations.documents();
        docs.extend(self.bookmarks.documents());
        docs.sort();
        docs.dedup();
        docs
    }
}
