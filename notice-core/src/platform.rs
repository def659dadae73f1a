//! OS-specific directories.

use std::path::PathBuf;
use crate::constants::APP_NAME;
use crate::error::{NoticeError, NoticeResult};

/// Per-user directory lookup for the current OS.
pub struct Platform;

impl Platform {
    /// Get the platform-specific application data directory.
    ///
    /// - Windows: `%APPDATA%/AdminNotice`
    /// - macOS: `~/Library/Application Support/AdminNotice`
    /// - Linux: `~/.local/share/AdminNotice`
    pub fn data_dir() -> NoticeResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| NoticeError::Config("could not determine data directory".into()))?;
        Ok(base.join(APP_NAME))
    }

    /// Get the platform-specific configuration directory.
    pub fn config_dir() -> NoticeResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| NoticeError::Config("could not determine config directory".into()))?;
        Ok(base.join(APP_NAME))
    }
}
