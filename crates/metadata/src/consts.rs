/// Source tag stamped on every record produced by this crate.
pub const SOURCE_TAG: &str = "box";

/// Identifier Box uses for the top-level "All Files" container.
pub const ROOT_FOLDER_ID: &str = "0";
/// Display name Box gives the top-level container in path collections.
pub const ROOT_FOLDER_NAME: &str = "All Files";

/// MIME type used when no extension can be found.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Fixed extension table. Keys are lowercase.
pub(crate) const MIME_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("ppt", "application/vnd.ms-powerpoint"),
    ("pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];
