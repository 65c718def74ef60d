use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ClientError, ClientResult};
use crate::fetcher::DEFAULT_API_BASE_URL;
use crate::search::DEFAULT_PAGE_SIZE;

pub const CONFIG_PATH_ENV: &str = "MULTIVERSE_CONFIG";
pub const PORT_ENV: &str = "PORT";
pub const API_URL_ENV: &str = "MULTIVERSE_API_URL";
pub const STATIC_ROOT_ENV: &str = "MULTIVERSE_STATIC_ROOT";
pub const SEARCH_CONCURRENCY_ENV: &str = "MULTIVERSE_SEARCH_CONCURRENCY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiverseConfig {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub page_size: usize,
    /// Remote pages fetched at once by a search; `None` means no cap.
    pub concurrency_limit: Option<usize>,
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_root: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_seconds: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency_limit: Some(8),
            debounce_ms: 400,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_root: PathBuf::from("."),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl MultiverseConfig {
    /// Reads the config file named by `MULTIVERSE_CONFIG` (if any), then
    /// applies environment overrides.
    pub fn from_env() -> ClientResult<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ClientResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|error| {
            ClientError::Config(format!("failed to read config {}: {error}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|error| {
            ClientError::Config(format!("failed to parse config {}: {error}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from `lookup`, which maps variable names to values.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ClientResult<()> {
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ClientError::Config(format!("invalid {PORT_ENV}: {port}")))?;
        }
        if let Some(url) = lookup(API_URL_ENV) {
            self.api.base_url = url;
        }
        if let Some(root) = lookup(STATIC_ROOT_ENV) {
            self.server.static_root = PathBuf::from(root);
        }
        if let Some(limit) = lookup(SEARCH_CONCURRENCY_ENV) {
            let limit = limit.trim();
            self.search.concurrency_limit = if limit.eq_ignore_ascii_case("unbounded") {
                None
            } else {
                Some(limit.parse().map_err(|_| {
                    ClientError::Config(format!("invalid {SEARCH_CONCURRENCY_ENV}: {limit}"))
                })?)
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.search.page_size == 0 {
            return Err(ClientError::Config("search.page_size must be positive".to_string()));
        }
        if self.search.concurrency_limit == Some(0) {
            return Err(ClientError::Config(
                "search.concurrency_limit must be positive when set".to_string(),
            ));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "api.base_url must start with http:// or https://: {}",
                self.api.base_url
            )));
        }
        Ok(())
    }
}
