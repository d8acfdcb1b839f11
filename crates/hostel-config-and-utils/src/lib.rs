//! Configuration, filesystem paths and logging setup shared by the InstaSolve crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_BASE_URL, DEFAULT_LOG_LEVEL, DEFAULT_REFRESH_INTERVAL_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
