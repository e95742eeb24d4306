//! TOML-based application configuration.
//!
//! Stores the household profile used by every calculation:
//! - Home size and construction
//! - Heating and cooling equipment
//! - Thermostat setpoints
//! - Utility prices
//! - Location for weather and rate lookups
//! - Heat-loss overrides
//! - API endpoints
//!
//! Configuration is stored at `~/.config/joule/config.toml`. API keys live
//! in the OS keyring, never in this file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::data_dir;
use crate::analysis::AnalysisSettings;
use crate::building::{BuildingProfile, HeatLossOverrides};
use crate::equipment::{AirConditioner, Furnace, HeatPump, PrimarySystem};
use crate::error::ConfigError;
use crate::forecast::ForecastSettings;
use crate::integrations::{eia, open_meteo, openei};
use crate::rates::RateSchedule;

/// Home construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeConfig {
    pub square_feet: f64,
    pub insulation_level: f64,
    pub home_shape: f64,
    pub ceiling_height_ft: f64,
    pub has_loft: bool,
    /// BTU/°F per square foot, used to turn coast-down decay into heat loss
    pub thermal_mass_per_sqft: f64,
}

/// Heating and cooling equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentConfig {
    pub primary_system: PrimarySystem,
    pub heat_pump_tons: f64,
    pub hspf2: f64,
    pub seer2: f64,
    /// 0-1
    pub afue: f64,
    pub use_electric_aux_heat: bool,
    /// Compressor lockout temperature
    pub aux_cutoff_temp_f: f64,
    pub aux_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermostatConfig {
    pub winter_day_f: f64,
    pub winter_night_f: f64,
    pub summer_day_f: f64,
    pub summer_night_f: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// $/kWh
    pub electricity_rate: f64,
    /// $/month
    pub fixed_monthly_charge: f64,
    /// $/therm
    pub gas_rate: f64,
    pub baseload_kwh_per_day: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub city: String,
    /// Two-letter code
    pub state: String,
    pub zip_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationConfig {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// "City, ST" or whichever part is set.
    pub fn label(&self) -> Option<String> {
        match (self.city.trim(), self.state.trim()) {
            ("", "") => None,
            (city, "") => Some(city.to_string()),
            ("", state) => Some(state.to_string()),
            (city, state) => Some(format!("{city}, {state}")),
        }
    }
}

/// Heat-loss factor overrides, BTU/hr/°F.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatLossConfig {
    pub use_manual: bool,
    pub manual_factor: f64,
    pub use_analyzer: bool,
    pub analyzer_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub open_meteo_forecast_url: String,
    pub open_meteo_archive_url: String,
    pub openei_url: String,
    pub eia_url: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/joule/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub home: HomeConfig,
    #[serde(default)]
    pub equipment: EquipmentConfig,
    #[serde(default)]
    pub thermostat: ThermostatConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub heat_loss: HeatLossConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for HomeConfig {
    fn default() -> Self {
        let building = BuildingProfile::default();
        Self {
            square_feet: building.square_feet,
            insulation_level: building.insulation_level,
            home_shape: building.home_shape,
            ceiling_height_ft: building.ceiling_height_ft,
            has_loft: building.has_loft,
            thermal_mass_per_sqft: 8.0,
        }
    }
}

impl Default for EquipmentConfig {
    fn default() -> Self {
        let hp = HeatPump::default();
        Self {
            primary_system: PrimarySystem::HeatPump,
            heat_pump_tons: hp.tons,
            hspf2: hp.hspf2,
            seer2: 15.0,
            afue: 0.95,
            use_electric_aux_heat: true,
            aux_cutoff_temp_f: hp.cutoff_temp_f,
            aux_kw: 10.0,
        }
    }
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            winter_day_f: 70.0,
            winter_night_f: 68.0,
            summer_day_f: 75.0,
            summer_night_f: 72.0,
        }
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            electricity_rate: 0.10,
            fixed_monthly_charge: 0.0,
            gas_rate: 1.20,
            baseload_kwh_per_day: 10.0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            open_meteo_forecast_url: open_meteo::DEFAULT_FORECAST_URL.to_string(),
            open_meteo_archive_url: open_meteo::DEFAULT_ARCHIVE_URL.to_string(),
            openei_url: openei::DEFAULT_BASE_URL.to_string(),
            eia_url: eia::DEFAULT_BASE_URL.to_string(),
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                if !existing.is_string() && matches!(value, "" | "null" | "none") {
                    // Only optional fields deserialize from null.
                    obj.insert(part.to_string(), serde_json::Value::Null);
                    return Ok(());
                }
                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(key, format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(key, format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(key, format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Unset optional: numbers and booleans keep their JSON type.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(key, e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "writing default config");
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Restore defaults on disk.
    pub fn reset() -> Result<Self, ConfigError> {
        let cfg = Self::default();
        cfg.save()?;
        Ok(cfg)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Every leaf as `(dot.path, value)`, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let path = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&path, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Change one value in memory after type and range checks.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(key, e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Range checks on values the calculations divide by or depend on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("home.square_feet", self.home.square_feet),
            ("home.insulation_level", self.home.insulation_level),
            ("home.home_shape", self.home.home_shape),
            ("home.ceiling_height_ft", self.home.ceiling_height_ft),
            ("home.thermal_mass_per_sqft", self.home.thermal_mass_per_sqft),
            ("equipment.heat_pump_tons", self.equipment.heat_pump_tons),
            ("equipment.hspf2", self.equipment.hspf2),
            ("equipment.seer2", self.equipment.seer2),
        ];
        for (key, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(invalid(key, format!("must be positive, got {v}")));
            }
        }
        if !(0.0..=1.0).contains(&self.equipment.afue) || self.equipment.afue == 0.0 {
            return Err(invalid("equipment.afue", "must be in (0, 1]"));
        }
        let prices = [
            ("rates.electricity_rate", self.rates.electricity_rate),
            ("rates.fixed_monthly_charge", self.rates.fixed_monthly_charge),
            ("rates.gas_rate", self.rates.gas_rate),
            ("rates.baseload_kwh_per_day", self.rates.baseload_kwh_per_day),
            ("heat_loss.manual_factor", self.heat_loss.manual_factor),
            ("heat_loss.analyzer_factor", self.heat_loss.analyzer_factor),
        ];
        for (key, v) in prices {
            if !(v.is_finite() && v >= 0.0) {
                return Err(invalid(key, format!("must not be negative, got {v}")));
            }
        }
        if let Some(lat) = self.location.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(invalid("location.latitude", format!("{lat} is out of range")));
            }
        }
        if let Some(lon) = self.location.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(invalid("location.longitude", format!("{lon} is out of range")));
            }
        }
        Ok(())
    }

    pub fn building_profile(&self) -> BuildingProfile {
        BuildingProfile {
            square_feet: self.home.square_feet,
            insulation_level: self.home.insulation_level,
            home_shape: self.home.home_shape,
            ceiling_height_ft: self.home.ceiling_height_ft,
            has_loft: self.home.has_loft,
        }
    }

    pub fn heat_pump(&self) -> HeatPump {
        HeatPump {
            tons: self.equipment.heat_pump_tons,
            hspf2: self.equipment.hspf2,
            cutoff_temp_f: self.equipment.aux_cutoff_temp_f,
        }
    }

    pub fn heat_loss_overrides(&self) -> HeatLossOverrides {
        HeatLossOverrides {
            use_manual: self.heat_loss.use_manual,
            manual_factor: self.heat_loss.manual_factor,
            use_analyzer: self.heat_loss.use_analyzer,
            analyzer_factor: self.heat_loss.analyzer_factor,
        }
    }

    /// Forecast inputs; a stored rate schedule replaces the flat rate.
    pub fn forecast_settings(&self, rate_schedule: Option<RateSchedule>) -> ForecastSettings {
        ForecastSettings {
            building: self.building_profile(),
            heat_loss: self.heat_loss_overrides(),
            primary_system: self.equipment.primary_system,
            heat_pump: self.heat_pump(),
            furnace: Furnace {
                afue: self.equipment.afue,
            },
            air_conditioner: AirConditioner {
                seer2: self.equipment.seer2,
            },
            use_electric_aux_heat: self.equipment.use_electric_aux_heat,
            winter_day_f: self.thermostat.winter_day_f,
            winter_night_f: self.thermostat.winter_night_f,
            summer_day_f: self.thermostat.summer_day_f,
            summer_night_f: self.thermostat.summer_night_f,
            electricity_rate: self.rates.electricity_rate,
            fixed_monthly_charge: self.rates.fixed_monthly_charge,
            gas_rate: self.rates.gas_rate,
            baseload_kwh_per_day: self.rates.baseload_kwh_per_day,
            rate_schedule,
            location: self.location.label(),
        }
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            square_feet: self.home.square_feet,
            thermal_mass_btu_per_f: self.home.square_feet * self.home.thermal_mass_per_sqft,
            heat_pump: self.heat_pump(),
            aux_kw: self.equipment.aux_kw,
            indoor_setpoint_f: self.thermostat.winter_day_f,
            ..AnalysisSettings::default()
        }
    }

    /// Record an analyzer result so forecasts can use it.
    pub fn adopt_analyzer_factor(&mut self, heat_loss_factor: f64) {
        self.heat_loss.analyzer_factor = heat_loss_factor;
        self.heat_loss.use_analyzer = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::HeatLossSource;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[home]\nsquare_feet = 2400\n").unwrap();
        assert_eq!(cfg.home.square_feet, 2400.0);
        assert_eq!(cfg.home.ceiling_height_ft, 8.0);
        assert_eq!(cfg.thermostat.winter_day_f, 70.0);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("equipment.primary_system").as_deref(), Some("heat_pump"));
        assert_eq!(cfg.get("home.has_loft").as_deref(), Some("false"));
        assert_eq!(cfg.get("location.latitude").as_deref(), Some("null"));
        assert!(cfg.get("home.missing_key").is_none());
    }

    #[test]
    fn apply_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.apply("home.square_feet", "2100").unwrap();
        cfg.apply("home.has_loft", "true").unwrap();
        cfg.apply("equipment.primary_system", "gas_furnace").unwrap();
        cfg.apply("location.latitude", "39.74").unwrap();
        cfg.apply("location.state", "CO").unwrap();
        assert_eq!(cfg.home.square_feet, 2100.0);
        assert!(cfg.home.has_loft);
        assert_eq!(cfg.equipment.primary_system, PrimarySystem::GasFurnace);
        assert_eq!(cfg.location.latitude, Some(39.74));
        assert_eq!(cfg.location.state, "CO");

        cfg.apply("location.latitude", "none").unwrap();
        assert_eq!(cfg.location.latitude, None);
    }

    #[test]
    fn apply_rejects_bad_input() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("home.nonexistent_key", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.apply("home.has_loft", "maybe").is_err());
        assert!(cfg.apply("home.square_feet", "-5").is_err());
        assert!(cfg.apply("equipment.primary_system", "wood_stove").is_err());
        assert!(cfg.apply("location.latitude", "120").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn entries_list_every_leaf() {
        let entries = Config::default().entries();
        assert!(entries.iter().any(|(k, v)| k == "rates.gas_rate" && v == "1.2"));
        assert!(entries.iter().any(|(k, _)| k == "api.eia_url"));
    }

    #[test]
    fn load_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg, Config::default());

        let mut changed = cfg.clone();
        changed.apply("thermostat.winter_night_f", "64").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().thermostat.winter_night_f, 64.0);
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "home = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn settings_conversions() {
        let mut cfg = Config::default();
        cfg.home.square_feet = 2000.0;
        cfg.location.city = "Denver".into();
        cfg.location.state = "CO".into();
        cfg.adopt_analyzer_factor(420.0);

        let fs = cfg.forecast_settings(None);
        assert_eq!(fs.location.as_deref(), Some("Denver, CO"));
        assert_eq!(fs.design_heat_loss(), (420.0 * 70.0, HeatLossSource::Analyzer));

        let a = cfg.analysis_settings();
        assert_eq!(a.thermal_mass_btu_per_f, 16_000.0);
        assert_eq!(a.square_feet, 2000.0);
    }
}
