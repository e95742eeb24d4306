//! Building heat-loss characteristics.
//!
//! Design heat loss is expressed in BTU/hr at a 70 °F indoor-outdoor
//! difference; dividing by 70 gives the heat-loss factor in BTU/hr/°F.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Temperature difference at which design heat loss is quoted.
pub const DESIGN_DELTA_T_F: f64 = 70.0;

/// Physical description of the home.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingProfile {
    pub square_feet: f64,
    /// Multiplier, 1.0 = average; lower is tighter
    pub insulation_level: f64,
    /// Shape factor, 1.0 = compact two-story box
    pub home_shape: f64,
    pub ceiling_height_ft: f64,
    pub has_loft: bool,
}

impl Default for BuildingProfile {
    fn default() -> Self {
        Self {
            square_feet: 1500.0,
            insulation_level: 1.0,
            home_shape: 1.0,
            ceiling_height_ft: 8.0,
            has_loft: false,
        }
    }
}

/// Rule-of-thumb design heat loss, rounded to the nearest 1000 BTU/hr.
pub fn design_heat_loss(profile: &BuildingProfile) -> f64 {
    let ceiling_mult = 1.0 + (profile.ceiling_height_ft - 8.0) * 0.1;
    let loft_shape = (1.2..1.3).contains(&profile.home_shape);
    let effective_sqft = if profile.has_loft && loft_shape {
        profile.square_feet * 0.65
    } else {
        profile.square_feet
    };
    let raw = effective_sqft * 22.67 * profile.insulation_level * profile.home_shape * ceiling_mult;
    (raw / 1000.0).round() * 1000.0
}

/// Where the heat-loss figure used for forecasting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLossSource {
    Manual,
    Analyzer,
    Calculated,
}

/// User overrides for the heat-loss factor (BTU/hr/°F).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatLossOverrides {
    pub use_manual: bool,
    pub manual_factor: f64,
    pub use_analyzer: bool,
    pub analyzer_factor: f64,
}

/// Pick the design heat loss: an enabled manual factor, else an enabled
/// analyzer factor, else the rule-of-thumb estimate.
pub fn resolve_heat_loss(
    profile: &BuildingProfile,
    overrides: &HeatLossOverrides,
) -> (f64, HeatLossSource) {
    if overrides.use_manual && overrides.manual_factor > 0.0 {
        return (overrides.manual_factor * DESIGN_DELTA_T_F, HeatLossSource::Manual);
    }
    if overrides.use_analyzer && overrides.analyzer_factor > 0.0 {
        return (
            overrides.analyzer_factor * DESIGN_DELTA_T_F,
            HeatLossSource::Analyzer,
        );
    }
    let calculated = design_heat_loss(profile);
    debug!(calculated, "using calculated design heat loss");
    (calculated, HeatLossSource::Calculated)
}

/// Inputs for the simplified Manual-J style load estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadParams {
    pub square_feet: f64,
    pub ceiling_height_ft: f64,
    pub insulation_level: f64,
    /// IECC climate zone 1-7
    pub climate_zone: u8,
}

impl Default for LoadParams {
    fn default() -> Self {
        Self {
            square_feet: 2000.0,
            ceiling_height_ft: 8.0,
            insulation_level: 1.0,
            climate_zone: 5,
        }
    }
}

/// Heating and cooling design loads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadEstimate {
    pub heating_load_btu_hr: f64,
    pub cooling_load_btu_hr: f64,
    pub heating_tons: f64,
    pub cooling_tons: f64,
    pub design_heating_temp_f: f64,
    pub design_cooling_temp_f: f64,
}

/// 99 % heating and 1 % cooling design temperatures by climate zone.
pub fn design_temperatures(climate_zone: u8) -> (f64, f64) {
    let heating = match climate_zone {
        1 => 30.0,
        2 => 20.0,
        3 => 10.0,
        4 => 0.0,
        5 => -5.0,
        6 => -10.0,
        7 => -15.0,
        _ => 0.0,
    };
    let cooling = match climate_zone {
        1 => 95.0,
        2 => 92.0,
        3 => 90.0,
        4 => 88.0,
        5 => 85.0,
        6 => 82.0,
        7 => 80.0,
        _ => 85.0,
    };
    (heating, cooling)
}

/// Simplified Manual-J heating and cooling loads.
///
/// Uses the DOE-average 0.32 BTU/hr/ft²/°F envelope coefficient scaled by
/// insulation level; cooling adds 20 % for internal gains.
pub fn manual_j_estimate(params: &LoadParams) -> LoadEstimate {
    const BASE_LOSS_PER_SQFT: f64 = 0.32;
    const INDOOR_HEATING_F: f64 = 70.0;
    const INDOOR_COOLING_F: f64 = 75.0;

    let factor = BASE_LOSS_PER_SQFT * params.insulation_level;
    let (design_heating, design_cooling) = design_temperatures(params.climate_zone);

    let heating = (params.square_feet * factor * (INDOOR_HEATING_F - design_heating)).round();
    let cooling =
        (params.square_feet * factor * (design_cooling - INDOOR_COOLING_F) * 1.2).round();

    LoadEstimate {
        heating_load_btu_hr: heating,
        cooling_load_btu_hr: cooling,
        heating_tons: round2(heating / 12_000.0),
        cooling_tons: round2(cooling / 12_000.0),
        design_heating_temp_f: design_heating,
        design_cooling_temp_f: design_cooling,
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
