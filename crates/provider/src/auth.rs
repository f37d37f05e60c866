//! Obtaining an authenticated search backend for a data source.
//!
//! Authentication is pluggable: the scan engine only ever sees an
//! [`Authenticator`] and the [`Authenticated`] bundle it hands back.

use crate::BackendHandle;
use crate::error::Result;
use crate::source::DataSource;
use async_trait::async_trait;
use serde_json::Value;

/// An authenticated client plus any credentials refreshed along the way.
pub struct Authenticated {
    pub backend: BackendHandle,
    /// Present when authentication produced new credential material (for
    /// example a rotated refresh token) that the host should store.
    pub updated_credentials: Option<Value>,
}

impl Authenticated {
    pub fn new(backend: BackendHandle) -> Self {
        Self {
            backend,
            updated_credentials: None,
        }
    }

    pub fn with_updated_credentials(mut self, credentials: Value) -> Self {
        self.updated_credentials = Some(credentials);
        self
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Produce a backend able to search on behalf of `source`.
    ///
    /// # Errors
    ///
    /// Any failure must be reported as
    /// [`ErrorKind::Authentication`](crate::error::ErrorKind::Authentication).
    async fn authenticate(&self, source: &DataSource) -> Result<Authenticated>;
}

#[cfg(feature = "box")]
pub use self::token::TokenAuthenticator;

#[cfg(feature = "box")]
mod token {
    use super::{Authenticated, Authenticator};
    use crate::backend::{BoxBackend, DEFAULT_BASE_URL};
    use crate::error::{ErrorKind, Result};
    use crate::source::DataSource;
    use async_trait::async_trait;
    use exn::ResultExt;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    /// Auth type handled by [`TokenAuthenticator`].
    pub const TOKEN_AUTH_TYPE: &str = "token";

    /// Authenticates with a pre-issued access token stored in the data
    /// source's credentials under `access_token`. Never refreshes.
    #[derive(Debug, Clone)]
    pub struct TokenAuthenticator {
        base_url: String,
        timeout: Duration,
    }

    impl TokenAuthenticator {
        pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
            Self {
                base_url: base_url.into(),
                timeout,
            }
        }

        fn access_token(source: &DataSource) -> Result<&str> {
            match source.auth_type.as_deref() {
                Some(TOKEN_AUTH_TYPE) => {},
                Some(other) => exn::bail!(ErrorKind::Authentication(format!("unsupported auth type {other:?}"))),
                None => exn::bail!(ErrorKind::Authentication(format!("data source {} has no auth type", source.id))),
            }
            source
                .credentials
                .get("access_token")
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .ok_or_else(|| {
                    exn::Exn::from(ErrorKind::Authentication(format!(
                        "data source {} has no access token",
                        source.id
                    )))
                })
        }
    }

    impl Default for TokenAuthenticator {
        fn default() -> Self {
            Self::new(DEFAULT_BASE_URL, Duration::from_secs(30))
        }
    }

    #[async_trait]
    impl Authenticator for TokenAuthenticator {
        async fn authenticate(&self, source: &DataSource) -> Result<Authenticated> {
            let token = Self::access_token(source)?;
            let backend = BoxBackend::new(&source.id, &self.base_url, token, self.timeout)
                .or_raise(|| ErrorKind::Authentication(format!("cannot build client for {}", source.id)))?;
            tracing::debug!(source = %source.id, "Authenticated with access token");
            Ok(Authenticated::new(Arc::new(backend)))
        }
    }

}

/// Hands out a fixed backend regardless of the data source, optionally
/// reporting refreshed credentials or failing outright.
#[cfg(any(test, feature = "mock"))]
pub struct StaticAuthenticator {
    backend: BackendHandle,
    updated_credentials: Option<Value>,
    failure: Option<String>,
}

#[cfg(any(test, feature = "mock"))]
impl StaticAuthenticator {
    pub fn new(backend: BackendHandle) -> Self {
        Self {
            backend,
            updated_credentials: None,
            failure: None,
        }
    }

    pub fn with_updated_credentials(mut self, credentials: Value) -> Self {
        self.updated_credentials = Some(credentials);
        self
    }

    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, _source: &DataSource) -> Result<Authenticated> {
        if let Some(reason) = &self.failure {
            exn::bail!(crate::error::ErrorKind::Authentication(reason.clone()));
        }
        let mut authenticated = Authenticated::new(self.backend.clone());
        authenticated.updated_credentials = self.updated_credentials.clone();
        Ok(authenticated)
    }
}
