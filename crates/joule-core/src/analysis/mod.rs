//! Heat-loss estimation from thermostat telemetry.
//!
//! [`analyze`] tries the coast-down method first and falls back to the
//! runtime energy balance when the log has no usable idle stretches.

pub mod coast_down;
pub mod runtime;
pub mod stats;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::building::{round2, DESIGN_DELTA_T_F};
use crate::equipment::HeatPump;
use crate::error::AnalysisError;
use crate::telemetry::TelemetryLog;

pub use coast_down::{CoastDownConfig, CoastDownEstimate, CoastDownSegment, Confidence};
pub use runtime::{RuntimeDay, RuntimeFit, RuntimeFitConfig};

/// Lower end of the balance-point search, °F.
pub const BALANCE_SEARCH_MIN_F: f64 = -30.0;
/// Upper end of the balance-point search, °F.
pub const BALANCE_SEARCH_MAX_F: f64 = 65.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    Found,
    /// The heat pump meets the load across the whole search range
    CoversFullRange,
    /// The heat pump falls short even at the warm end of the range
    NeverCovers,
}

/// Outdoor temperature where heat-pump capacity equals building loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub temp_f: Option<f64>,
    pub status: BalanceStatus,
}

/// Bisect `capacity(T) = UA · (indoor − T)` over the search range.
pub fn balance_point(ua: f64, indoor_f: f64, heat_pump: &HeatPump) -> BalancePoint {
    // Positive when the heat pump keeps up.
    let surplus = |t: f64| heat_pump.capacity_btu_hr(t) - ua * (indoor_f - t).max(0.0);

    if surplus(BALANCE_SEARCH_MIN_F) >= 0.0 {
        return BalancePoint {
            temp_f: None,
            status: BalanceStatus::CoversFullRange,
        };
    }
    if surplus(BALANCE_SEARCH_MAX_F) < 0.0 {
        return BalancePoint {
            temp_f: None,
            status: BalanceStatus::NeverCovers,
        };
    }

    let (mut lo, mut hi) = (BALANCE_SEARCH_MIN_F, BALANCE_SEARCH_MAX_F);
    while hi - lo > 0.01 {
        let mid = (lo + hi) / 2.0;
        if surplus(mid) >= 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    BalancePoint {
        temp_f: Some((hi * 10.0).round() / 10.0),
        status: BalanceStatus::Found,
    }
}

/// Inputs that do not come from the telemetry itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub square_feet: f64,
    /// BTU/°F
    pub thermal_mass_btu_per_f: f64,
    pub heat_pump: HeatPump,
    pub aux_kw: f64,
    pub indoor_setpoint_f: f64,
    pub coast_down: CoastDownConfig,
    pub runtime: RuntimeFitConfig,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            square_feet: 1500.0,
            thermal_mass_btu_per_f: 1500.0 * 8.0,
            heat_pump: HeatPump::default(),
            aux_kw: 10.0,
            indoor_setpoint_f: 68.0,
            coast_down: CoastDownConfig::default(),
            runtime: RuntimeFitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateMethod {
    CoastDown,
    RuntimeBalance,
}

impl std::fmt::Display for EstimateMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimateMethod::CoastDown => write!(f, "coast_down"),
            EstimateMethod::RuntimeBalance => write!(f, "runtime_balance"),
        }
    }
}

/// Everything derived from one telemetry log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub method: EstimateMethod,
    /// BTU/hr/°F
    pub heat_loss_factor: f64,
    /// BTU/hr at a 70 °F difference
    pub design_heat_loss_btu_hr: f64,
    pub heat_loss_per_sqft: f64,
    pub balance_point: BalancePoint,
    pub coast_down: Option<CoastDownEstimate>,
    pub runtime_fit: Option<RuntimeFit>,
    pub data_start: Option<NaiveDateTime>,
    pub data_end: Option<NaiveDateTime>,
    pub rows: usize,
    pub days: usize,
}

/// Estimate the heat-loss factor and balance point.
///
/// Both methods are attempted so the result carries the cross-check when
/// available; coast-down wins whenever it succeeds.
///
/// # Errors
/// Returns the coast-down error when neither method yields a factor.
pub fn analyze(
    log: &TelemetryLog,
    settings: &AnalysisSettings,
) -> Result<AnalysisResult, AnalysisError> {
    if log.is_empty() {
        return Err(AnalysisError::InsufficientData("telemetry log is empty".to_string()));
    }

    let coast = coast_down::estimate(log, settings.thermal_mass_btu_per_f, &settings.coast_down);
    let runtime_fit = runtime::fit(log, &settings.heat_pump, settings.aux_kw, &settings.runtime);

    let (method, ua, coast, runtime_fit) = match (coast, runtime_fit) {
        (Ok(c), r) => (EstimateMethod::CoastDown, c.heat_loss_factor, Some(c), r.ok()),
        (Err(e), Ok(r)) => {
            warn!(error = %e, "coast-down unavailable, using runtime balance");
            (EstimateMethod::RuntimeBalance, r.heat_loss_factor, None, Some(r))
        }
        (Err(e), Err(runtime_err)) => {
            warn!(error = %runtime_err, "runtime balance unavailable");
            return Err(e);
        }
    };

    let (data_start, data_end) = match log.date_range() {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };
    let heat_loss_per_sqft = if settings.square_feet > 0.0 {
        round2(ua / settings.square_feet)
    } else {
        0.0
    };
    info!(%method, ua, "heat-loss factor estimated");

    Ok(AnalysisResult {
        method,
        heat_loss_factor: round2(ua),
        design_heat_loss_btu_hr: (ua * DESIGN_DELTA_T_F).round(),
        heat_loss_per_sqft,
        balance_point: balance_point(ua, settings.indoor_setpoint_f, &settings.heat_pump),
        coast_down: coast,
        runtime_fit,
        data_start,
        data_end,
        rows: log.rows.len(),
        days: log.daily_summaries().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_point_is_where_capacity_meets_loss() {
        let hp = HeatPump::default();
        let bp = balance_point(500.0, 70.0, &hp);
        assert_eq!(bp.status, BalanceStatus::Found);
        let t = bp.temp_f.unwrap();
        let gap = hp.capacity_btu_hr(t) - 500.0 * (70.0 - t);
        assert!(gap.abs() < 100.0, "gap {gap} at {t}");
    }

    #[test]
    fn balance_point_edge_statuses() {
        let hp = HeatPump::default();
        // Compressor lockout at -15 °F bounds a tiny load from below.
        let tiny = balance_point(1.0, 70.0, &hp);
        assert_eq!(tiny.status, BalanceStatus::Found);

        let no_cutoff = HeatPump {
            cutoff_temp_f: -100.0,
            ..hp
        };
        let covered = balance_point(1.0, 70.0, &no_cutoff);
        assert_eq!(covered.status, BalanceStatus::CoversFullRange);
        assert_eq!(covered.temp_f, None);

        let never = balance_point(50_000.0, 70.0, &hp);
        assert_eq!(never.status, BalanceStatus::NeverCovers);
    }

    #[test]
    fn empty_log_is_insufficient() {
        let log = TelemetryLog::from_rows(Vec::new());
        assert!(matches!(
            analyze(&log, &AnalysisSettings::default()),
            Err(AnalysisError::InsufficientData(_))
        ));
    }
}
