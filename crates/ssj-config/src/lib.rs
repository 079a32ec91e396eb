//! ssj-config: TOML settings for the debugger.

pub mod config;
pub mod error;
pub mod load;
pub mod merge;
pub mod validate;

pub use config::{Config, ConnectionConfig, DisplayConfig, LogConfig, LogLevel, WatermarkConfig};
pub use error::ConfigError;
pub use load::{load_config, load_default, load_from_str};
