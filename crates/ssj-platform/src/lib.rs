//! ssj-platform: per-user directories and log-file housekeeping.

pub mod error;
pub mod logging;
pub mod paths;

pub use error::PlatformError;
pub use logging::{ensure_log_dir, log_level_to_filter, rotate_log_files};
pub use paths::{DefaultPaths, PlatformPaths};
