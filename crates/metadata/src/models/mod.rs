mod item;
mod record;

pub use self::item::{ParentRef, PathCollection, PathEntry, RawItem, SharedLink};
pub use self::record::FileMetadataRecord;
