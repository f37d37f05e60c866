use crate::consts::{DEFAULT_MIME_TYPE, MIME_TYPES};

/// Infer a MIME type from a file name.
///
/// The extension is everything after the last `.` and is matched
/// case-insensitively against a fixed table. Extensions that aren't in the
/// table become `application/<ext>`; names without an extension fall back to
/// `application/octet-stream`.
///
/// ```
/// use boxscan_metadata::mime_type_from_name;
/// assert_eq!(mime_type_from_name("report.PDF"), "application/pdf");
/// assert_eq!(mime_type_from_name("file.xyz"), "application/xyz");
/// assert_eq!(mime_type_from_name("noext"), "application/octet-stream");
/// ```
#[must_use]
pub fn mime_type_from_name(filename: &str) -> String {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return DEFAULT_MIME_TYPE.to_string();
    };
    // A trailing dot ("draft.") has no usable extension either.
    if ext.is_empty() {
        return DEFAULT_MIME_TYPE.to_string();
    }
    let ext = ext.to_lowercase();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| (*mime).to_string())
        .unwrap_or_else(|| format!("application/{ext}"))
}
