//! Support code for the `nvs-kv` command-line tool.

mod config;
mod logging;

pub use config::{Config, ConfigError, LogFormat, LoggingConfig, StoreConfig};
pub use logging::{LoggingError, init as init_logging};
