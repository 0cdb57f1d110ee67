// ── Core identity types ──
//
// ItemId and DocumentId are the only things the load/view machinery
// needs to know about an item.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

// ── ItemId ──────────────────────────────────────────────────────────

/// Identifier of an annotation or bookmark, exactly as the backend
/// issued it.
///
/// The key text is never normalized: an uppercase UUID stays uppercase,
/// so the id handed back to `remove` is byte-for-byte the one `fetch_all`
/// returned. Equality is plain string equality. Cloning is a refcount
/// bump since ids are copied into removal tasks and pending sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Arc<str>);

impl ItemId {
    /// Generate a fresh random identifier (hyphenated lowercase UUID v4).
    pub fn new_v4() -> Self {
        Self::from(Uuid::new_v4())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key parsed as a UUID, for backends that issue UUID keys.
    /// Parsing is case-insensitive; the stored key is untouched.
    pub fn to_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.0).ok()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<Uuid> for ItemId {
    fn from(u: Uuid) -> Self {
        Self(Arc::from(u.hyphenated().to_string()))
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

// ── DocumentId ──────────────────────────────────────────────────────

/// Key of the document a collection view is bound to.
///
/// Leading and trailing whitespace is trimmed so that `" doc-1 "` and
/// `"doc-1"` address the same collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
