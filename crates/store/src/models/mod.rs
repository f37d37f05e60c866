mod order;
mod row;

pub use self::order::{ScanMetadata, ScanOrder, ScanStatus, ScanType};
pub(crate) use self::row::ScanOrderRow;
