//! Layered configuration for boxscan.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. A configuration file (YAML, TOML or JSON, picked by extension). Either
//!    given explicitly, or the first `config.{yaml,yml,toml,json}` found in the
//!    platform config directory.
//! 3. `BOXSCAN_`-prefixed environment variables, with `__` separating nested
//!    keys (`BOXSCAN_SCAN__MAX_BATCH_SIZE=100`).

pub mod error;

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ErrorKind, Result};

pub const ENV_PREFIX: &str = "BOXSCAN_";
pub const TOKEN_AUTH_TYPE: &str = "token";
const CONFIG_FILE_NAMES: [&str; 4] = ["config.yaml", "config.yml", "config.toml", "config.json"];

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "boxscan")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database holding scan orders
    pub database: PathBuf,
    pub api: ApiConfig,
    pub scan: ScanConfig,
    /// Data sources by identifier
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub max_batch_size: u64,
    pub rate_limit_delay_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_auth_type")]
    pub auth_type: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

fn default_auth_type() -> String {
    TOKEN_AUTH_TYPE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        let database = project_dirs()
            .map(|dirs| dirs.data_dir().join("boxscan.sqlite"))
            .unwrap_or_else(|| PathBuf::from("boxscan.sqlite"));
        Self {
            database,
            api: ApiConfig::default(),
            scan: ScanConfig::default(),
            sources: BTreeMap::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.box.com/2.0".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 300,
            rate_limit_delay_ms: 500,
            max_retries: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

impl ScanConfig {
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Config {
    /// Load configuration from defaults, a file and the environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = Self::file_figment(path)?.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Defaults layered with the configuration file only.
    fn file_figment(path: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::FileNotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_file(),
        };
        let Some(file) = file else {
            return Ok(figment);
        };
        tracing::debug!(path = %file.display(), "Reading configuration file");
        let extension = file.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        Ok(match extension.as_deref() {
            Some("yaml" | "yml") => figment.merge(Yaml::file(&file)),
            Some("toml") => figment.merge(Toml::file(&file)),
            Some("json") => figment.merge(Json::file(&file)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(file)),
        })
    }

    fn default_file() -> Option<PathBuf> {
        let dirs = project_dirs()?;
        CONFIG_FILE_NAMES.iter().map(|name| dirs.config_dir().join(name)).find(|path| path.is_file())
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.max_batch_size == 0 {
            exn::bail!(ErrorKind::Invalid("scan.max_batch_size must be greater than zero".to_string()));
        }
        for (id, source) in &self.sources {
            let has_token = source.access_token.as_deref().is_some_and(|token| !token.is_empty());
            if source.auth_type == TOKEN_AUTH_TYPE && !has_token {
                exn::bail!(ErrorKind::Invalid(format!("sources.{id}.access_token is required for token authentication")));
            }
        }
        Ok(())
    }

    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.get(id)
    }
}
