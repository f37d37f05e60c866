pub mod auth;
pub mod backend;
pub mod error;
mod models;
mod source;

#[cfg(any(test, feature = "mock"))]
pub use crate::auth::StaticAuthenticator;
#[cfg(feature = "box")]
pub use crate::auth::TokenAuthenticator;
pub use crate::auth::{Authenticated, Authenticator};
pub use crate::backend::SearchBackend;
pub use crate::models::{SEARCH_FIELDS, SearchPage, SearchRequest, encode_timestamp};
pub use crate::source::{DataSource, DataSourceMetadata, ROOT_FOLDER_ID};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn SearchBackend + Send + Sync>;
