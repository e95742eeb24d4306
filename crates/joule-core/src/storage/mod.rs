mod config;
pub mod database;
pub mod migrations;

pub use config::{
    ApiConfig, Config, EquipmentConfig, HeatLossConfig, HomeConfig, LocationConfig, RatesConfig,
    ThermostatConfig,
};
pub use database::{AnalysisRecord, Database};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/joule[-dev]/` based on JOULE_ENV.
///
/// Set JOULE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("JOULE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("joule-dev")
    } else {
        base_dir.join("joule")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
