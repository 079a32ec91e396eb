use std::path::{Path, PathBuf};

use crate::error::PlatformError;

/// Standard per-user directories for the debugger.
pub trait PlatformPaths: Send + Sync {
    /// Configuration directory (`~/.config/ssj`).
    fn config_dir(&self) -> PathBuf;
    /// Data directory (`~/.local/share/ssj`).
    fn data_dir(&self) -> PathBuf;
    /// Log directory (`<data_dir>/logs`).
    fn log_dir(&self) -> PathBuf;
    /// The user's home directory.
    fn home_dir(&self) -> PathBuf;

    /// Default log file inside [`log_dir`](Self::log_dir).
    fn log_file(&self) -> PathBuf {
        self.log_dir().join("ssj.log")
    }
}

/// [`PlatformPaths`] rooted at the user's home directory.
#[derive(Debug, Clone)]
pub struct DefaultPaths {
    home: PathBuf,
}

impl DefaultPaths {
    /// Resolve the home directory from the OS, falling back to `$HOME`.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Path` if no home directory can be found.
    pub fn new() -> Result<Self, PlatformError> {
        let home = dirs::home_dir()
            .or_else(|| std::env::var("HOME").ok().map(PathBuf::from))
            .ok_or_else(|| PlatformError::Path("could not determine home directory".into()))?;
        Ok(Self { home })
    }

    /// Paths rooted at an explicit home directory.
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        Self {
            home: home.as_ref().to_path_buf(),
        }
    }
}

impl PlatformPaths for DefaultPaths {
    fn config_dir(&self) -> PathBuf {
        self.home.join(".config").join("ssj")
    }

    fn data_dir(&self) -> PathBuf {
        self.home.join(".local").join("share").join("ssj")
    }

    fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    fn home_dir(&self) -> PathBuf {
        self.home.clone()
    }
}
