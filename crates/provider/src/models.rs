//! Search request and response models.
//!
//! The request is kept structured (folder, window, time filter) so that
//! backends can interpret it natively; [`SearchRequest::query_params`]
//! renders the exact parameters sent to `GET /search`.

use exn::ResultExt;
use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::error::{ErrorKind, Result};

/// Fields requested for every search entry.
pub const SEARCH_FIELDS: &str = "id,name,type,modified_at,created_at,size,shared_link,parent,path_collection";

/// One page of a file search scoped to a folder and all of its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Folder whose subtree is searched
    pub ancestor_folder_id: String,
    /// Page size
    pub limit: u64,
    /// Number of results to skip
    pub offset: u64,
    /// Lower bound on `updated_at`, already encoded for Box
    pub updated_since: Option<String>,
}

impl SearchRequest {
    pub fn new(ancestor_folder_id: impl Into<String>, offset: u64, limit: u64) -> Self {
        Self {
            ancestor_folder_id: ancestor_folder_id.into(),
            limit,
            offset,
            updated_since: None,
        }
    }

    /// Restrict results to files modified or created at or after `since`.
    pub fn updated_since(mut self, since: OffsetDateTime) -> Result<Self> {
        self.updated_since = Some(encode_timestamp(since)?);
        Ok(self)
    }

    /// Search query text (Box metadata query syntax).
    pub fn query(&self) -> String {
        format!("type:file ancestor_folder_ids:{}", self.ancestor_folder_id)
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", self.query()),
            ("type", "file".to_string()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
        ];
        if let Some(since) = &self.updated_since {
            // Open-ended range: "<from>," means "from onwards".
            params.push(("updated_at_range", format!("{since},")));
        }
        params
    }
}

/// Encode a timestamp the way the Box search API expects range bounds:
/// RFC 3339 in UTC, whole seconds, `Z` suffix.
pub fn encode_timestamp(timestamp: OffsetDateTime) -> Result<String> {
    let utc = timestamp.to_offset(UtcOffset::UTC);
    // Zero is always a valid nanosecond.
    let whole = utc.replace_nanosecond(0).unwrap_or(utc);
    whole.format(&Rfc3339).or_raise(|| ErrorKind::Unclassified(format!("cannot encode timestamp {timestamp}")))
}

/// A single page of search results.
///
/// Entries are left as raw JSON so that one malformed entry can be rejected
/// by the caller without losing the rest of the page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub entries: Vec<Value>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

impl SearchPage {
    pub fn new(entries: Vec<Value>, total_count: u64) -> Self {
        Self {
            entries,
            total_count: Some(total_count),
        }
    }

    /// Decode a response body, treating anything unreadable as an empty page.
    pub fn from_slice(body: &[u8]) -> Self {
        match serde_json::from_slice(body) {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(error = %err, bytes = body.len(), "Unreadable search response; treating as empty");
                Self::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
