use crate::error::{Error, ErrorKind};
use crate::models::{ScanMetadata, ScanOrder};
use exn::ResultExt;
use time::OffsetDateTime;

#[derive(sqlx::FromRow)]
pub(crate) struct ScanOrderRow {
    pub(crate) id: String,
    pub(crate) data_source_id: String,
    pub(crate) scan_type: String,
    #[sqlx(default)]
    pub(crate) scanned_from: Option<i64>,
    pub(crate) scan_metadata: String,
    pub(crate) status: String,
    pub(crate) created_at: i64,
    #[sqlx(default)]
    pub(crate) completed_at: Option<i64>,
}

fn from_unix(timestamp: i64, field: &'static str) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::from_unix_timestamp(timestamp).or_raise(|| ErrorKind::InvalidData(field))
}

impl TryFrom<&ScanOrder> for ScanOrderRow {
    type Error = Error;
    fn try_from(order: &ScanOrder) -> Result<Self, Self::Error> {
        Ok(Self {
            id: order.id.clone(),
            data_source_id: order.data_source_id.clone(),
            scan_type: order.scan_type.as_str().to_string(),
            scanned_from: order.scanned_from.map(OffsetDateTime::unix_timestamp),
            scan_metadata: serde_json::to_string(&order.scan_metadata)
                .or_raise(|| ErrorKind::InvalidData("scan metadata"))?,
            status: order.status.as_str().to_string(),
            created_at: order.created_at.unix_timestamp(),
            completed_at: order.completed_at.map(OffsetDateTime::unix_timestamp),
        })
    }
}

impl TryFrom<ScanOrderRow> for ScanOrder {
    type Error = Error;
    fn try_from(row: ScanOrderRow) -> Result<Self, Self::Error> {
        let scan_metadata: ScanMetadata =
            serde_json::from_str(&row.scan_metadata).or_raise(|| ErrorKind::InvalidData("scan metadata"))?;
        Ok(Self {
            id: row.id,
            data_source_id: row.data_source_id,
            scan_type: row.scan_type.parse()?,
            scanned_from: row.scanned_from.map(|ts| from_unix(ts, "scanned from")).transpose()?,
            scan_metadata,
            status: row.status.parse()?,
            created_at: from_unix(row.created_at, "created at")?,
            completed_at: row.completed_at.map(|ts| from_unix(ts, "completed at")).transpose()?,
        })
    }
}
