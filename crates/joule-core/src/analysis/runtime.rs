//! Energy-balance heat-loss estimate from daily equipment runtime.
//!
//! On a heating day the heat delivered by the equipment balances the
//! building's loss: `Q / hours ≈ UA · (Tin − Tout)`. Regressing delivered
//! BTU/hr against the daily temperature difference through the origin
//! gives `UA`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stats::{linear_regression, regression_through_origin};
use crate::equipment::{HeatPump, BTU_PER_KWH};
use crate::error::AnalysisError;
use crate::telemetry::{DailySummary, TelemetryLog};

/// Day-selection thresholds for the runtime fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuntimeFitConfig {
    pub min_delta_t_f: f64,
    /// Fraction of the day the telemetry must cover
    pub min_day_coverage: f64,
    pub min_days: usize,
}

impl Default for RuntimeFitConfig {
    fn default() -> Self {
        Self {
            min_delta_t_f: 5.0,
            min_day_coverage: 0.75,
            min_days: 3,
        }
    }
}

/// One day's contribution to the fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeDay {
    pub date: chrono::NaiveDate,
    pub delta_t_f: f64,
    pub delivered_btu_per_hour: f64,
    pub heat_runtime_fraction: f64,
}

/// Result of the runtime energy-balance fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeFit {
    pub days: Vec<RuntimeDay>,
    /// BTU/hr/°F
    pub heat_loss_factor: f64,
    pub r_squared: f64,
    /// Outdoor temperature where heating runtime extrapolates to zero
    pub heating_onset_temp_f: Option<f64>,
}

fn covered_hours(day: &DailySummary, interval_min: f64) -> f64 {
    (day.samples as f64 * interval_min / 60.0).min(24.0)
}

/// Fit `UA` from daily heat-pump and aux runtime.
///
/// `aux_kw` is the electric resistance strip size used to convert aux
/// runtime into delivered heat.
///
/// # Errors
/// Returns [`AnalysisError::InsufficientData`] with fewer than
/// `cfg.min_days` qualifying heating days.
pub fn fit(
    log: &TelemetryLog,
    heat_pump: &HeatPump,
    aux_kw: f64,
    cfg: &RuntimeFitConfig,
) -> Result<RuntimeFit, AnalysisError> {
    let interval_min = log.sample_interval_minutes().unwrap_or(5.0);
    let summaries = log.daily_summaries();

    let mut days = Vec::new();
    let mut onset_x = Vec::new();
    let mut onset_y = Vec::new();

    for day in &summaries {
        let hours = covered_hours(day, interval_min);
        if hours < 24.0 * cfg.min_day_coverage || day.cool_runtime_hours > 0.0 {
            continue;
        }
        let (Some(outdoor), Some(delta_t)) = (day.avg_outdoor_f, day.delta_t()) else {
            continue;
        };

        let fraction = (day.heat_runtime_hours / hours).min(1.0);
        onset_x.push(outdoor);
        onset_y.push(fraction);

        let heating = day.heat_runtime_hours + day.aux_runtime_hours;
        if delta_t < cfg.min_delta_t_f || heating <= 0.0 {
            continue;
        }
        let hp_btu = day.heat_runtime_hours * heat_pump.capacity_btu_hr(outdoor);
        let aux_btu = day.aux_runtime_hours * aux_kw * BTU_PER_KWH;
        days.push(RuntimeDay {
            date: day.date,
            delta_t_f: delta_t,
            delivered_btu_per_hour: (hp_btu + aux_btu) / hours,
            heat_runtime_fraction: fraction,
        });
    }

    if days.len() < cfg.min_days {
        return Err(AnalysisError::InsufficientData(format!(
            "{} heating days with full coverage, need {}",
            days.len(),
            cfg.min_days
        )));
    }

    let xs: Vec<f64> = days.iter().map(|d| d.delta_t_f).collect();
    let ys: Vec<f64> = days.iter().map(|d| d.delivered_btu_per_hour).collect();
    let (ua, r_squared) = regression_through_origin(&xs, &ys)
        .ok_or_else(|| AnalysisError::FitRejected("degenerate runtime data".to_string()))?;
    if ua <= 0.0 {
        return Err(AnalysisError::FitRejected(format!(
            "non-positive heat-loss factor {ua:.1}"
        )));
    }

    let heating_onset_temp_f = linear_regression(&onset_x, &onset_y)
        .filter(|f| f.slope < 0.0)
        .and_then(|f| f.x_intercept());
    debug!(days = days.len(), ua, r_squared, "runtime fit");

    Ok(RuntimeFit {
        days,
        heat_loss_factor: ua,
        r_squared,
        heating_onset_temp_f,
    })
}
