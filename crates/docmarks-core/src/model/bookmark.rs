// ── Bookmark domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DocumentId, ItemId};
use crate::repository::CollectionItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: ItemId,
    pub document: DocumentId,
    /// Zero-based page index.
    pub page: u32,
    /// User-visible label; falls back to the page number when absent.
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Label to show in a list row.
    pub fn label(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Page {}", self.page + 1))
    }
}

impl CollectionItem for Bookmark {
    fn id(&self) -> &ItemId {
        &self.id
    }
}
