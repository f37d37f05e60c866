use serde::Serialize;
use time::OffsetDateTime;

/// Canonical description of one file found during a scan.
///
/// Records are derived on every batch and never stored by the engine; the
/// caller that receives them owns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadataRecord {
    /// Box file ID
    pub id: String,
    pub name: String,
    /// Always [`SOURCE_TAG`](crate::consts::SOURCE_TAG)
    pub source: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_time: Option<OffsetDateTime>,
    /// File size in bytes
    pub size: u64,
    pub mime_type: String,
    /// Shared link URL, or empty when the file isn't shared
    pub web_view_link: String,
    pub parent_folder_id: String,
    /// Ancestor folder names joined with `/`, rooted at `/`
    pub folder_path: String,
}
