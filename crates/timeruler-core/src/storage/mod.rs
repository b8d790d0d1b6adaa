mod config;

pub use config::{Config, DisplayConfig, WatchConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/timeruler[-dev]/` based on TIMERULER_ENV.
///
/// Set TIMERULER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .ok_or_else(|| ConfigError::NoDataDir("home directory is not set".into()))?
        .join(".config");

    let env = std::env::var("TIMERULER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timeruler-dev")
    } else {
        base_dir.join("timeruler")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::NoDataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
