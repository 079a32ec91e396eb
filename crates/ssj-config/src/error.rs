use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, parsing, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// Writing the commented default file failed.
    #[error("failed to create default config: {0}")]
    CreateDefault(String),

    #[error("TOML parse error: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("validation error: {field}: {message}")]
    Validation {
        /// Dotted path of the offending key, e.g. `connection.port`.
        field: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Platform(#[from] ssj_platform::PlatformError),
}
