use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of the Box root folder ("All Files").
pub const ROOT_FOLDER_ID: &str = "0";

/// A configured Box account/folder to be scanned.
///
/// Owned by the hosting system; immutable for the duration of a scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    /// Selects the [`Authenticator`](crate::Authenticator) behaviour.
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub metadata: DataSourceMetadata,
    /// Opaque credential material, only ever read by authenticators.
    #[serde(default)]
    pub credentials: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceMetadata {
    /// Folder whose subtree is scanned
    #[serde(default)]
    pub folder_id: Option<String>,
}

impl DataSource {
    /// Folder the sweep starts from, falling back to the Box root.
    pub fn root_folder_id(&self) -> &str {
        self.metadata.folder_id.as_deref().filter(|id| !id.is_empty()).unwrap_or(ROOT_FOLDER_ID)
    }
}
