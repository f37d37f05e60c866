use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use time::OffsetDateTime;

/// Whether a scan order enumerates everything or only recent changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    #[default]
    Full,
    Incremental,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

impl Display for ScanType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "incremental" => Ok(Self::Incremental),
            _ => exn::bail!(ErrorKind::InvalidData("scan type")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    #[default]
    Pending,
    Completed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for ScanStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => exn::bail!(ErrorKind::InvalidData("scan status")),
        }
    }
}

/// Free-form scan order metadata.
///
/// The `cursor` key is owned by the scan engine; every other key is carried
/// along untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A scan job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOrder {
    pub id: String,
    pub data_source_id: String,
    pub scan_type: ScanType,
    /// Reference point for incremental scans.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scanned_from: Option<OffsetDateTime>,
    #[serde(default)]
    pub scan_metadata: ScanMetadata,
    #[serde(default)]
    pub status: ScanStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl ScanOrder {
    pub fn new(id: impl Into<String>, data_source_id: impl Into<String>, scan_type: ScanType) -> Self {
        Self {
            id: id.into(),
            data_source_id: data_source_id.into(),
            scan_type,
            scanned_from: None,
            scan_metadata: ScanMetadata::default(),
            status: ScanStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
            completed_at: None,
        }
    }

    pub fn with_scanned_from(mut self, scanned_from: OffsetDateTime) -> Self {
        self.scanned_from = Some(scanned_from);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == ScanStatus::Completed
    }
}
