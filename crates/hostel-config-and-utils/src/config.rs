//! Client configuration.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default backend API root. Endpoint paths are joined onto it.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/accounts/api/";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Access tokens are refreshed every 14 minutes.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 14 * 60;

/// Default per-request transport timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Root URL of the complaint backend's account API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Period of the background token refresh.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Timeout applied to every HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("INSTASOLVE_LOG_LEVEL") {
            if !log_level.trim().is_empty() {
                self.log_level = log_level;
            }
        }
        if let Ok(api_url) = std::env::var("INSTASOLVE_API_URL") {
            if !api_url.trim().is_empty() {
                self.api_base_url = api_url.trim().to_string();
            }
        }
    }

    /// Reject values the session core cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.refresh_interval_secs == 0 {
            return Err(CoreError::Config(
                "refresh_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.api_base_url()?;
        Ok(())
    }

    /// Parsed API root. A trailing slash is added so relative endpoint
    /// paths join under it instead of replacing its last segment.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        let raw = if self.api_base_url.ends_with('/') {
            self.api_base_url.clone()
        } else {
            format!("{}/", self.api_base_url)
        };
        Url::parse(&raw).map_err(CoreError::from)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
