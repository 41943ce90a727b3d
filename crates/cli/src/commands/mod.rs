pub mod ask;
pub mod doctor;
pub mod init;
pub mod serve;

use dvagent_config::AppConfig;
use std::path::{Path, PathBuf};

/// The config file in use: `--config`, else `~/.dvagent/config.toml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load the config file with environment overrides applied.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = config_path(explicit);
    AppConfig::load_with_overrides(&path).map_err(|e| format!("Failed to load config: {e}").into())
}
