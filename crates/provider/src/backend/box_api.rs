//! Box Content API search backend.
//!
//! Issues `GET {base_url}/search` with a bearer token. The Box SDK's
//! auto-paging iterators are deliberately not mirrored here: one call is one
//! HTTP request.
//!
//! # Credentials
//!
//! The backend takes a ready-to-use access token. Obtaining and refreshing
//! tokens is the job of an [`Authenticator`](crate::Authenticator).

use crate::backend::SearchBackend;
use crate::error::{ErrorKind, Result};
use crate::models::{SearchPage, SearchRequest};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Client;
use std::time::Duration;

/// Public Box Content API root.
pub const DEFAULT_BASE_URL: &str = "https://api.box.com/2.0";

/// Box search backend.
///
/// # Examples
///
/// ```no_run
/// use boxscan_provider::backend::{BoxBackend, DEFAULT_BASE_URL};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = BoxBackend::new("finance", DEFAULT_BASE_URL, "access-token", Duration::from_secs(30))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BoxBackend {
    name: String,
    client: Client,
    base_url: String,
    access_token: String,
}

impl BoxBackend {
    /// Create a new Box backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `base_url` - API root, normally [`DEFAULT_BASE_URL`]
    /// * `access_token` - OAuth2 access token or developer token
    /// * `timeout` - Per-request timeout
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("boxscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Unclassified("failed to build HTTP client".to_string()))?;
        Ok(Self {
            name: name.into(),
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

#[async_trait]
impl SearchBackend for BoxBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let url = self.search_url();
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&request.query_params())
            .send()
            .await
            .or_raise(|| ErrorKind::Unclassified(format!("request to {url} failed")))?;
        let status = response.status();
        if !status.is_success() {
            // The body is only useful for debugging; don't fail twice over it.
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(backend = %self.name, status = status.as_u16(), body = %body, "Search request rejected");
            let resource = format!("folder {}", request.ancestor_folder_id);
            exn::bail!(ErrorKind::from_status(status.as_u16(), resource));
        }
        let body = response
            .bytes()
            .await
            .or_raise(|| ErrorKind::Unclassified(format!("failed to read response body from {url}")))?;
        Ok(SearchPage::from_slice(&body))
    }
}
