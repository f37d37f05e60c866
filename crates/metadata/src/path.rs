//! Folder path reconstruction from Box path collections.

use crate::consts::{ROOT_FOLDER_ID, ROOT_FOLDER_NAME};
use crate::models::{PathCollection, PathEntry};

fn is_synthetic_root(entry: &PathEntry) -> bool {
    entry.id.as_deref() == Some(ROOT_FOLDER_ID) && entry.name.as_deref() == Some(ROOT_FOLDER_NAME)
}

/// Build a `/`-separated folder path from the ancestors Box reports for an
/// item.
///
/// The synthetic "All Files" container is dropped when it leads the
/// collection, and entries without a name are skipped. A missing or empty
/// collection resolves to `/`.
///
/// ```
/// use boxscan_metadata::build_folder_path;
/// use boxscan_metadata::models::{PathCollection, PathEntry};
///
/// let collection = PathCollection {
///     entries: vec![PathEntry::new("0", "All Files"), PathEntry::new("5", "Reports")],
/// };
/// assert_eq!(build_folder_path(Some(&collection)), "/Reports");
/// assert_eq!(build_folder_path(None), "/");
/// ```
#[must_use]
pub fn build_folder_path(collection: Option<&PathCollection>) -> String {
    let Some(collection) = collection else {
        return "/".to_string();
    };
    let names: Vec<&str> = collection
        .entries
        .iter()
        .enumerate()
        .filter(|(index, entry)| !(*index == 0 && is_synthetic_root(entry)))
        .filter_map(|(_, entry)| entry.name.as_deref())
        .filter(|name| !name.is_empty())
        .collect();
    format!("/{}", names.join("/"))
}
