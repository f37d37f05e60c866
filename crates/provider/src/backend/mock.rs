//! In-memory search backend for testing.

use crate::backend::SearchBackend;
use crate::error::{ErrorKind, Result};
use crate::models::{SearchPage, SearchRequest};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Mutex;

enum Scripted {
    Fail(ErrorKind),
    Respond(SearchPage),
}

/// In-memory search backend for testing.
///
/// Holds a flat list of raw Box file entries and answers searches by
/// filtering them (ancestor folder, `updated_at` lower bound) and slicing the
/// requested window. Failures and canned pages can be scripted ahead of time,
/// and every request is recorded for later inspection.
///
/// # Examples
///
/// ```
/// use boxscan_provider::backend::{MockBackend, SearchBackend};
/// use boxscan_provider::SearchRequest;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files("0", 5);
/// let page = backend.search(&SearchRequest::new("0", 3, 10)).await?;
/// assert_eq!(page.entries.len(), 2);
/// assert_eq!(page.total_count, Some(5));
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    entries: Mutex<Vec<Value>>,
    scripted: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl MockBackend {
    /// Create a mock backend holding the given raw entries.
    pub fn with_entries(entries: impl IntoIterator<Item = Value>) -> Self {
        Self {
            name: "mock".to_string(),
            entries: Mutex::new(entries.into_iter().collect()),
            scripted: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock backend with `count` files directly inside `folder_id`.
    ///
    /// Files are named `file-0000.txt`, `file-0001.txt`, ... and carry a
    /// path collection rooted at "All Files".
    pub fn with_files(folder_id: &str, count: usize) -> Self {
        Self::with_entries((0..count).map(|index| Self::file_entry(&format!("{index}"), folder_id)))
    }

    /// Build a raw file entry shaped like a Box search result.
    pub fn file_entry(id: &str, folder_id: &str) -> Value {
        let index: usize = id.parse().unwrap_or(0);
        json!({
            "type": "file",
            "id": id,
            "name": format!("file-{index:04}.txt"),
            "modified_at": "2024-01-15T08:00:00Z",
            "created_at": "2024-01-10T08:00:00Z",
            "size": 1024,
            "shared_link": null,
            "parent": { "type": "folder", "id": folder_id },
            "path_collection": {
                "total_count": 2,
                "entries": [
                    { "type": "folder", "id": "0", "name": "All Files" },
                    { "type": "folder", "id": folder_id, "name": format!("Folder {folder_id}") }
                ]
            }
        })
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fail the next search with `kind`. Scripted outcomes queue up in order.
    pub async fn fail_next(&self, kind: ErrorKind) {
        self.scripted.lock().await.push_back(Scripted::Fail(kind));
    }

    /// Answer the next search with a canned page instead of the stored entries.
    pub async fn respond_next(&self, page: SearchPage) {
        self.scripted.lock().await.push_back(Scripted::Respond(page));
    }

    pub async fn push_entry(&self, entry: Value) {
        self.entries.lock().await.push(entry);
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().await.clone()
    }

    fn in_folder(entry: &Value, folder_id: &str) -> bool {
        if folder_id == crate::source::ROOT_FOLDER_ID {
            return true;
        }
        let parent = entry.pointer("/parent/id").and_then(Value::as_str) == Some(folder_id);
        let ancestor = entry
            .pointer("/path_collection/entries")
            .and_then(Value::as_array)
            .is_some_and(|ancestors| ancestors.iter().any(|a| a.get("id").and_then(Value::as_str) == Some(folder_id)));
        parent || ancestor
    }

    fn updated_since(entry: &Value, since: Option<&str>) -> bool {
        let Some(since) = since.and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok()) else {
            return true;
        };
        ["modified_at", "created_at"].iter().any(|field| {
            entry
                .get(*field)
                .and_then(Value::as_str)
                .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
                .is_some_and(|at| at >= since)
        })
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::with_entries([])
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        self.requests.lock().await.push(request.clone());
        match self.scripted.lock().await.pop_front() {
            Some(Scripted::Fail(kind)) => exn::bail!(kind),
            Some(Scripted::Respond(page)) => return Ok(page),
            None => {},
        }
        let guard = self.entries.lock().await;
        let matching: Vec<&Value> = guard
            .iter()
            .filter(|entry| Self::in_folder(entry, &request.ancestor_folder_id))
            .filter(|entry| Self::updated_since(entry, request.updated_since.as_deref()))
            .collect();
        let total = matching.len() as u64;
        let window = matching
            .into_iter()
            .skip(usize::try_from(request.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(request.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(SearchPage::new(window, total))
    }
}
