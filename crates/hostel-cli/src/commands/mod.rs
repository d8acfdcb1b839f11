//! CLI command implementations.

mod account;
mod auth;

pub use account::{profile, reset_confirm, reset_request};
pub use auth::{keepalive, login, logout, refresh, route, status};

use anyhow::{Context as _, Result};
use hostel_auth::{HttpTransport, ReqwestTransport, SessionManager};
use hostel_config_and_utils::{init_logging, Config, Paths};
use hostel_credential_store::create_credential_store;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, built once per invocation.
pub struct Context {
    pub config: Config,
    pub transport: Arc<dyn HttpTransport>,
    pub manager: Arc<SessionManager>,
}

impl Context {
    /// Load config, start logging and restore the stored session.
    pub fn build(log_level: Option<&str>, api_url: Option<&str>) -> Result<Self> {
        let paths = Paths::new()?;
        let mut config = Config::load(&paths).context("Failed to load configuration")?;
        if let Some(api_url) = api_url {
            config.api_base_url = api_url.to_string();
            config.validate().context("Invalid --api-url")?;
        }

        init_logging(log_level.unwrap_or(&config.log_level));
        debug!(api = %config.api_base_url, "Configuration loaded");

        paths.ensure_dirs()?;
        let store = create_credential_store(&paths).context("Failed to open credential store")?;
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::from_config(&config)?);
        let manager = Arc::new(SessionManager::new(store, transport.clone())?);

        Ok(Self {
            config,
            transport,
            manager,
        })
    }
}

/// Read one trimmed line from stdin after printing `label`.
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
