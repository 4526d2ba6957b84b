mod config;

pub use config::{Config, LogConfig, StoreConfig, ToggleConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Path of `~/.config/xeffect[-dev]/` based on XEFFECT_ENV, without
/// creating it.
///
/// Set XEFFECT_ENV=dev to use development data directory.
pub fn data_dir_path() -> PathBuf {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("XEFFECT_ENV").unwrap_or_else(|_| "production".to_string());

    if env == "dev" {
        base_dir.join("xeffect-dev")
    } else {
        base_dir.join("xeffect")
    }
}

/// Returns [`data_dir_path`], creating the directory if needed.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = data_dir_path();
    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
