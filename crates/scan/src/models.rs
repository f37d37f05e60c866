use boxscan_metadata::models::FileMetadataRecord;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

/// Per-invocation counters reported with every batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStats {
    pub files_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub scan_started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_scan_batch_at: OffsetDateTime,
    /// Only set on the batch that finishes a sweep.
    #[serde(with = "time::serde::rfc3339::option")]
    pub scan_completed_at: Option<OffsetDateTime>,
    pub api_calls_made: u64,
    pub api_errors_encountered: u64,
}

/// Outcome of one batch.
///
/// `is_completed` is `true` only when this batch reached the end of the
/// sweep. A populated `error` always comes with `is_completed == false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub files: Vec<FileMetadataRecord>,
    pub is_completed: bool,
    pub stats: ScanStats,
    /// Credentials rotated during authentication, for the host to store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_credentials: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    pub(crate) fn success(files: Vec<FileMetadataRecord>, is_completed: bool, stats: ScanStats) -> Self {
        Self {
            files,
            is_completed,
            stats,
            updated_credentials: None,
            error: None,
        }
    }

    pub(crate) fn failed(files: Vec<FileMetadataRecord>, stats: ScanStats, error: impl Into<String>) -> Self {
        Self {
            files,
            is_completed: false,
            stats,
            updated_credentials: None,
            error: Some(error.into()),
        }
    }

    pub(crate) fn with_updated_credentials(mut self, credentials: Option<Value>) -> Self {
        self.updated_credentials = credentials;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
