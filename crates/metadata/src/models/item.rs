//! Box file objects as they appear in search results.
//!
//! Only the fields requested through the search `fields` parameter are
//! modelled. Everything except `id` is optional: Box omits fields freely and
//! returns `null` for an unshared item's `shared_link`.

use serde::Deserialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub shared_link: Option<SharedLink>,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub path_collection: Option<PathCollection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SharedLink {
    #[serde(default)]
    pub url: Option<String>,
}

/// Mini folder object for the item's direct parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ParentRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// Ordered ancestors of an item, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PathCollection {
    #[serde(default)]
    pub entries: Vec<PathEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PathEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
impl PathEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }
}
