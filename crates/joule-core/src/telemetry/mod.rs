//! Thermostat telemetry ingestion.
//!
//! Parses runtime CSV exports (ecobee-style reports and similar vendor
//! formats) into a time-ordered [`TelemetryLog`] and derives per-day
//! summaries used by the heat-loss estimators.

mod columns;
mod parser;

pub use columns::{classify_header, ColumnMap, ColumnRole};
pub use parser::parse_thermostat_csv;

pub(crate) use parser::parse_date;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One interval of thermostat telemetry.
///
/// Runtimes are seconds of equipment operation within the interval;
/// temperatures are °F regardless of the export's unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatRow {
    pub timestamp: NaiveDateTime,
    pub outdoor_temp_f: Option<f64>,
    pub indoor_temp_f: Option<f64>,
    pub heat_runtime_s: f64,
    pub aux_runtime_s: f64,
    pub cool_runtime_s: f64,
    pub heat_setpoint_f: Option<f64>,
    pub cool_setpoint_f: Option<f64>,
    pub humidity: Option<f64>,
}

impl ThermostatRow {
    /// True when no heating or cooling equipment ran during the interval.
    pub fn is_idle(&self) -> bool {
        self.heat_runtime_s <= 0.0 && self.aux_runtime_s <= 0.0 && self.cool_runtime_s <= 0.0
    }

    /// Indoor minus outdoor temperature, when both are known.
    pub fn delta_t(&self) -> Option<f64> {
        Some(self.indoor_temp_f? - self.outdoor_temp_f?)
    }
}

/// Bookkeeping produced while parsing a CSV export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseReport {
    /// 1-based line number of the header row
    pub header_line: usize,
    pub columns: ColumnMap,
    /// Non-empty lines after the header
    pub total_rows: usize,
    pub parsed_rows: usize,
    pub skipped_rows: usize,
    pub duplicate_rows: usize,
    /// First few skip reasons
    pub warnings: Vec<String>,
}

/// Per-day aggregate of telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub avg_outdoor_f: Option<f64>,
    pub avg_indoor_f: Option<f64>,
    pub heat_runtime_hours: f64,
    pub aux_runtime_hours: f64,
    pub cool_runtime_hours: f64,
    pub samples: usize,
}

impl DailySummary {
    pub fn delta_t(&self) -> Option<f64> {
        Some(self.avg_indoor_f? - self.avg_outdoor_f?)
    }
}

/// Parsed, time-ordered thermostat telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryLog {
    pub rows: Vec<ThermostatRow>,
    pub report: ParseReport,
}

impl TelemetryLog {
    /// Build a log directly from rows (sorted by timestamp).
    pub fn from_rows(mut rows: Vec<ThermostatRow>) -> Self {
        rows.sort_by_key(|r| r.timestamp);
        let report = ParseReport {
            total_rows: rows.len(),
            parsed_rows: rows.len(),
            ..ParseReport::default()
        };
        Self { rows, report }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First and last timestamps.
    pub fn date_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.rows.first()?.timestamp, self.rows.last()?.timestamp))
    }

    /// Median spacing between consecutive rows, in minutes.
    pub fn sample_interval_minutes(&self) -> Option<f64> {
        let mut gaps: Vec<f64> = self
            .rows
            .windows(2)
            .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds() as f64 / 60.0)
            .filter(|g| *g > 0.0)
            .collect();
        if gaps.is_empty() {
            return None;
        }
        gaps.sort_by(|a, b| a.total_cmp(b));
        Some(crate::analysis::stats::median_sorted(&gaps))
    }

    /// Aggregate rows by calendar date.
    pub fn daily_summaries(&self) -> Vec<DailySummary> {
        #[derive(Default)]
        struct Acc {
            outdoor_sum: f64,
            outdoor_n: usize,
            indoor_sum: f64,
            indoor_n: usize,
            heat_s: f64,
            aux_s: f64,
            cool_s: f64,
            samples: usize,
        }

        let mut by_day: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
        for row in &self.rows {
            let acc = by_day.entry(row.timestamp.date()).or_default();
            if let Some(t) = row.outdoor_temp_f {
                acc.outdoor_sum += t;
                acc.outdoor_n += 1;
            }
            if let Some(t) = row.indoor_temp_f {
                acc.indoor_sum += t;
                acc.indoor_n += 1;
            }
            acc.heat_s += row.heat_runtime_s;
            acc.aux_s += row.aux_runtime_s;
            acc.cool_s += row.cool_runtime_s;
            acc.samples += 1;
        }

        by_day
            .into_iter()
            .map(|(date, acc)| DailySummary {
                date,
                avg_outdoor_f: (acc.outdoor_n > 0).then(|| acc.outdoor_sum / acc.outdoor_n as f64),
                avg_indoor_f: (acc.indoor_n > 0).then(|| acc.indoor_sum / acc.indoor_n as f64),
                heat_runtime_hours: acc.heat_s / 3600.0,
                aux_runtime_hours: acc.aux_s / 3600.0,
                cool_runtime_hours: acc.cool_s / 3600.0,
                samples: acc.samples,
            })
            .collect()
    }
}
