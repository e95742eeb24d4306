//! Coast-down heat-loss estimation.
//!
//! While all equipment is off, indoor temperature decays toward outdoor at
//! a rate proportional to the temperature difference:
//! `dTin/dt = -(UA / C) * (Tin - Tout)`. Fitting the indoor slope over an
//! idle stretch yields the decay rate `k = UA / C`; multiplying by the
//! thermal mass `C` gives the heat-loss factor `UA`.

use std::ops::Range;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stats::{linear_regression, weighted_median};
use crate::error::AnalysisError;
use crate::telemetry::{TelemetryLog, ThermostatRow};

/// Thresholds for accepting an idle stretch as a coast-down segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoastDownConfig {
    pub min_duration_minutes: f64,
    /// Minimum indoor-outdoor difference on every row
    pub min_delta_t_f: f64,
    /// Minimum indoor temperature drop across the segment
    pub min_temp_drop_f: f64,
    /// A gap longer than this many sample intervals splits a segment
    pub max_gap_intervals: f64,
}

impl Default for CoastDownConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: 120.0,
            min_delta_t_f: 10.0,
            min_temp_drop_f: 0.5,
            max_gap_intervals: 2.0,
        }
    }
}

/// One fitted coast-down stretch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoastDownSegment {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_hours: f64,
    pub start_indoor_f: f64,
    pub end_indoor_f: f64,
    pub mean_delta_t_f: f64,
    /// Indoor temperature slope, °F/hr (negative while coasting)
    pub slope_f_per_hour: f64,
    /// `-slope / mean ΔT`, 1/hr
    pub decay_rate_per_hour: f64,
    pub r_squared: f64,
    pub samples: usize,
}

/// Qualitative confidence in an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Aggregate coast-down estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoastDownEstimate {
    pub segments: Vec<CoastDownSegment>,
    /// Candidate stretches whose fit was rejected (temperature not falling)
    pub rejected_segments: usize,
    pub decay_rate_per_hour: f64,
    pub time_constant_hours: f64,
    pub thermal_mass_btu_per_f: f64,
    /// BTU/hr/°F
    pub heat_loss_factor: f64,
    pub confidence: Confidence,
}

fn qualifies(row: &ThermostatRow, cfg: &CoastDownConfig) -> bool {
    row.is_idle() && row.delta_t().is_some_and(|dt| dt >= cfg.min_delta_t_f)
}

/// Index ranges of idle stretches long enough to fit.
pub fn find_segments(log: &TelemetryLog, cfg: &CoastDownConfig) -> Vec<Range<usize>> {
    let interval_min = log.sample_interval_minutes().unwrap_or(5.0);
    let max_gap_secs = (interval_min * cfg.max_gap_intervals * 60.0).round() as i64;

    let rows = &log.rows;
    let mut ranges = Vec::new();
    let mut start: Option<usize> = None;

    let close = |s: usize, e: usize, ranges: &mut Vec<Range<usize>>| {
        if e - s < 3 {
            return;
        }
        let first = &rows[s];
        let last = &rows[e - 1];
        let minutes = (last.timestamp - first.timestamp).num_seconds() as f64 / 60.0;
        let drop = first.indoor_temp_f.unwrap_or(0.0) - last.indoor_temp_f.unwrap_or(0.0);
        if minutes >= cfg.min_duration_minutes && drop >= cfg.min_temp_drop_f {
            ranges.push(s..e);
        }
    };

    for i in 0..rows.len() {
        let ok = qualifies(&rows[i], cfg);
        if let Some(s) = start {
            let contiguous =
                (rows[i].timestamp - rows[i - 1].timestamp).num_seconds() <= max_gap_secs;
            if ok && contiguous {
                continue;
            }
            close(s, i, &mut ranges);
            start = None;
        }
        if ok {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        close(s, rows.len(), &mut ranges);
    }
    ranges
}

/// Fit one stretch. Returns `None` if the indoor temperature is not falling.
pub fn fit_segment(rows: &[ThermostatRow]) -> Option<CoastDownSegment> {
    let first = rows.first()?;
    let last = rows.last()?;

    let mut hours = Vec::with_capacity(rows.len());
    let mut indoor = Vec::with_capacity(rows.len());
    let mut delta_sum = 0.0;
    for row in rows {
        let (Some(t_in), Some(dt)) = (row.indoor_temp_f, row.delta_t()) else {
            continue;
        };
        hours.push((row.timestamp - first.timestamp).num_seconds() as f64 / 3600.0);
        indoor.push(t_in);
        delta_sum += dt;
    }

    let fit = linear_regression(&hours, &indoor)?;
    if fit.slope >= 0.0 {
        return None;
    }
    let mean_delta_t = delta_sum / hours.len() as f64;
    if mean_delta_t <= 0.0 {
        return None;
    }

    Some(CoastDownSegment {
        start: first.timestamp,
        end: last.timestamp,
        duration_hours: (last.timestamp - first.timestamp).num_seconds() as f64 / 3600.0,
        start_indoor_f: first.indoor_temp_f?,
        end_indoor_f: last.indoor_temp_f?,
        mean_delta_t_f: mean_delta_t,
        slope_f_per_hour: fit.slope,
        decay_rate_per_hour: -fit.slope / mean_delta_t,
        r_squared: fit.r_squared,
        samples: hours.len(),
    })
}

fn confidence(segments: &[CoastDownSegment]) -> Confidence {
    let mean_r2 = segments.iter().map(|s| s.r_squared).sum::<f64>() / segments.len() as f64;
    match segments.len() {
        n if n >= 5 && mean_r2 >= 0.8 => Confidence::High,
        n if n >= 2 && mean_r2 >= 0.5 => Confidence::Medium,
        _ => Confidence::Low,
    }
}

/// Estimate the heat-loss factor from every coast-down stretch in the log.
///
/// Per-segment decay rates are combined with a duration-weighted median so
/// that one noisy short stretch cannot dominate.
///
/// # Errors
/// Returns [`AnalysisError::InsufficientData`] when no stretch qualifies and
/// [`AnalysisError::FitRejected`] for a non-positive thermal mass.
pub fn estimate(
    log: &TelemetryLog,
    thermal_mass_btu_per_f: f64,
    cfg: &CoastDownConfig,
) -> Result<CoastDownEstimate, AnalysisError> {
    if thermal_mass_btu_per_f <= 0.0 {
        return Err(AnalysisError::FitRejected(format!(
            "thermal mass must be positive, got {thermal_mass_btu_per_f}"
        )));
    }

    let ranges = find_segments(log, cfg);
    let candidates = ranges.len();
    let segments: Vec<CoastDownSegment> = ranges
        .into_iter()
        .filter_map(|r| fit_segment(&log.rows[r]))
        .collect();
    let rejected = candidates - segments.len();
    debug!(candidates, accepted = segments.len(), "coast-down segments");

    if segments.is_empty() {
        return Err(AnalysisError::InsufficientData(format!(
            "no idle stretch of at least {} minutes with a {} °F indoor drop",
            cfg.min_duration_minutes, cfg.min_temp_drop_f
        )));
    }

    let weighted: Vec<(f64, f64)> = segments
        .iter()
        .map(|s| (s.decay_rate_per_hour, s.duration_hours))
        .collect();
    let k = weighted_median(&weighted).ok_or_else(|| {
        AnalysisError::FitRejected("decay rates could not be combined".to_string())
    })?;

    Ok(CoastDownEstimate {
        confidence: confidence(&segments),
        segments,
        rejected_segments: rejected,
        decay_rate_per_hour: k,
        time_constant_hours: 1.0 / k,
        thermal_mass_btu_per_f,
        heat_loss_factor: thermal_mass_btu_per_f * k,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn idle_row(ts: NaiveDateTime, indoor: f64, outdoor: f64) -> ThermostatRow {
        ThermostatRow {
            timestamp: ts,
            outdoor_temp_f: Some(outdoor),
            indoor_temp_f: Some(indoor),
            heat_runtime_s: 0.0,
            aux_runtime_s: 0.0,
            cool_runtime_s: 0.0,
            heat_setpoint_f: None,
            cool_setpoint_f: None,
            humidity: None,
        }
    }

    /// Exponential decay toward `outdoor` with rate `k` per hour, 5-minute rows.
    fn decay(start: NaiveDateTime, t0: f64, outdoor: f64, k: f64, hours: i64) -> Vec<ThermostatRow> {
        (0..=hours * 12)
            .map(|i| {
                let h = i as f64 / 12.0;
                let t = outdoor + (t0 - outdoor) * (-k * h).exp();
                idle_row(start + Duration::minutes(5 * i), t, outdoor)
            })
            .collect()
    }

    fn night(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn recovers_decay_rate_from_synthetic_night() {
        let k = 0.02;
        let log = TelemetryLog::from_rows(decay(night(10), 70.0, 20.0, k, 4));
        let est = estimate(&log, 10_000.0, &CoastDownConfig::default()).unwrap();

        assert_eq!(est.segments.len(), 1);
        assert!((est.decay_rate_per_hour - k).abs() < 0.002);
        assert!((est.heat_loss_factor - 200.0).abs() < 20.0);
        assert!((est.time_constant_hours - 50.0).abs() < 5.0);
        assert_eq!(est.confidence, Confidence::Low);
    }

    #[test]
    fn heating_interrupts_segment() {
        let mut rows = decay(night(10), 70.0, 20.0, 0.02, 4);
        rows[20].heat_runtime_s = 300.0;
        let log = TelemetryLog::from_rows(rows);
        let ranges = find_segments(&log, &CoastDownConfig::default());
        // 0..20 spans 95 minutes, too short; 21..49 spans 135 minutes.
        assert_eq!(ranges, vec![21..49]);
    }

    #[test]
    fn small_delta_t_is_ignored() {
        let log = TelemetryLog::from_rows(decay(night(10), 70.0, 65.0, 0.05, 4));
        let err = estimate(&log, 10_000.0, &CoastDownConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }

    #[test]
    fn combines_several_nights() {
        let mut rows = Vec::new();
        for day in 10..16 {
            rows.extend(decay(night(day), 70.0, 25.0, 0.03, 3));
        }
        let log = TelemetryLog::from_rows(rows);
        let est = estimate(&log, 12_000.0, &CoastDownConfig::default()).unwrap();
        assert_eq!(est.segments.len(), 6);
        assert_eq!(est.confidence, Confidence::High);
        assert!((est.heat_loss_factor - 360.0).abs() < 30.0);
    }

    #[test]
    fn rejects_non_positive_thermal_mass() {
        let log = TelemetryLog::from_rows(decay(night(10), 70.0, 20.0, 0.02, 4));
        assert!(matches!(
            estimate(&log, 0.0, &CoastDownConfig::default()),
            Err(AnalysisError::FitRejected(_))
        ));
    }
}
