//! Normalization of Box search entries into [`FileMetadataRecord`]s.
//!
//! Box returns loosely-shaped JSON file objects. This crate turns a single
//! entry into a canonical record: the folder path is rebuilt from the
//! entry's path collection, the MIME type is inferred from the file name,
//! and absent optional fields are replaced with safe defaults.

pub mod consts;
pub mod error;
mod mime;
pub mod models;
mod path;

use exn::ResultExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::consts::SOURCE_TAG;
use crate::error::{ErrorKind, Result};
pub use crate::mime::mime_type_from_name;
use crate::models::{FileMetadataRecord, RawItem};
pub use crate::path::build_folder_path;

/// Top-level entrypoint: normalize one raw search entry.
///
/// `fallback_parent_id` is used when the entry doesn't report its parent,
/// which should be the folder currently being walked.
///
/// # Errors
///
/// Returns [`MalformedItem`](ErrorKind::MalformedItem) if the entry is not a
/// JSON object of the expected shape (including unparsable timestamps), and
/// [`MissingField`](ErrorKind::MissingField) if it has an empty `id`.
#[instrument(level = "trace", skip(entry))]
pub fn build_record(entry: &Value, fallback_parent_id: &str) -> Result<FileMetadataRecord> {
    let item = RawItem::deserialize(entry).or_raise(|| ErrorKind::MalformedItem)?;
    normalize(item, fallback_parent_id)
}

/// Normalize an already-decoded [`RawItem`].
pub fn normalize(item: RawItem, fallback_parent_id: &str) -> Result<FileMetadataRecord> {
    if item.id.is_empty() {
        exn::bail!(ErrorKind::MissingField("id"));
    }
    let name = item.name.unwrap_or_default();
    let mime_type = mime_type_from_name(&name);
    let folder_path = build_folder_path(item.path_collection.as_ref());
    let web_view_link = item.shared_link.and_then(|link| link.url).unwrap_or_default();
    let parent_folder_id = item
        .parent
        .and_then(|parent| parent.id)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| fallback_parent_id.to_string());
    Ok(FileMetadataRecord {
        id: item.id,
        name,
        source: SOURCE_TAG.to_string(),
        last_modified: item.modified_at,
        created_time: item.created_at,
        size: item.size.unwrap_or(0),
        mime_type,
        web_view_link,
        parent_folder_id,
        folder_path,
    })
}
