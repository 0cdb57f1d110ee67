// ── Annotation domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{DocumentId, ItemId};
use crate::repository::CollectionItem;

/// Visual style of an annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnnotationStyle {
    #[default]
    Highlight,
    Underline,
    Strikeout,
    Note,
}

/// A user-created mark on a page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: ItemId,
    pub document: DocumentId,
    /// Zero-based page index.
    pub page: u32,
    #[serde(default)]
    pub style: AnnotationStyle,
    /// The selected text, if the annotation spans text.
    #[serde(default)]
    pub quote: Option<String>,
    /// Free-form comment attached by the user.
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CollectionItem for Annotation {
    fn id(&self) -> &ItemId {
        &self.id
    }
}
