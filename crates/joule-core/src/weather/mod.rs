//! Daily weather inputs for cost forecasting.
//!
//! Parses Open-Meteo daily responses, synthesizes hourly temperatures from a
//! day's high and low, and fills out a full calendar month.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ValidationError};

const SERVICE: &str = "open-meteo";

/// Relative humidity assumed when the source has none, percent.
pub const DEFAULT_HUMIDITY_PCT: f64 = 60.0;
/// Placeholder day used for dates with no data.
pub const FALLBACK_HIGH_F: f64 = 50.0;
pub const FALLBACK_LOW_F: f64 = 40.0;
pub const FALLBACK_AVG_F: f64 = 45.0;

/// One day of weather.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub date: NaiveDate,
    pub high_f: f64,
    pub low_f: f64,
    pub avg_f: f64,
    pub humidity_pct: f64,
}

impl DailyWeather {
    pub fn new(date: NaiveDate, high_f: f64, low_f: f64, humidity_pct: f64) -> Self {
        Self {
            date,
            high_f,
            low_f,
            avg_f: (high_f + low_f) / 2.0,
            humidity_pct,
        }
    }

    fn fallback(date: NaiveDate) -> Self {
        Self {
            date,
            high_f: FALLBACK_HIGH_F,
            low_f: FALLBACK_LOW_F,
            avg_f: FALLBACK_AVG_F,
            humidity_pct: DEFAULT_HUMIDITY_PCT,
        }
    }

    /// Synthesized temperature at `hour` (0-23).
    pub fn temp_at(&self, hour: u32) -> f64 {
        hourly_temp(self.low_f, self.high_f, self.avg_f, hour)
    }
}

/// Cosine daily temperature profile: coldest at 06:00, warmest twelve
/// hours later.
pub fn hourly_temp(low: f64, high: f64, avg: f64, hour: u32) -> f64 {
    let phase = ((hour as f64 - 6.0) / 12.0) * std::f64::consts::PI;
    avg + (phase - std::f64::consts::PI).cos() * ((high - low) / 2.0)
}

/// Number of days in a calendar month.
pub fn days_in_month(year: i32, month: u32) -> Result<u32, ValidationError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(ValidationError::InvalidMonth(month))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(ValidationError::InvalidMonth(month))?;
    Ok((next - first).num_days() as u32)
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default, alias = "relative_humidity_2m")]
    relativehumidity_2m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: DailyBlock,
    #[serde(default)]
    hourly: Option<HourlyBlock>,
}

fn parse_date_str(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ApiError::malformed(SERVICE, format!("bad date '{s}': {e}")))
}

/// Mean hourly humidity per `YYYY-MM-DD` prefix.
fn humidity_by_day(hourly: &HourlyBlock) -> BTreeMap<&str, f64> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (ts, rh) in hourly.time.iter().zip(&hourly.relativehumidity_2m) {
        let (Some(day), Some(rh)) = (ts.get(..10), rh) else {
            continue;
        };
        let entry = sums.entry(day).or_insert((0.0, 0));
        entry.0 += rh;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(day, (sum, n))| (day, sum / n as f64))
        .collect()
}

fn parse_daily(text: &str, with_humidity: bool) -> Result<Vec<DailyWeather>, ApiError> {
    let resp: DailyResponse =
        serde_json::from_str(text).map_err(|e| ApiError::malformed(SERVICE, e.to_string()))?;
    let hourly = resp.hourly.unwrap_or_default();
    let humidity = if with_humidity {
        humidity_by_day(&hourly)
    } else {
        BTreeMap::new()
    };

    let daily = &resp.daily;
    let mut days = Vec::with_capacity(daily.time.len());
    for (i, day) in daily.time.iter().enumerate() {
        let high = daily.temperature_2m_max.get(i).copied().flatten();
        let low = daily.temperature_2m_min.get(i).copied().flatten();
        let (Some(high), Some(low)) = (high, low) else {
            debug!(day = %day, "skipping day without temperatures");
            continue;
        };
        let rh = humidity
            .get(day.as_str())
            .copied()
            .unwrap_or(DEFAULT_HUMIDITY_PCT);
        days.push(DailyWeather::new(parse_date_str(day)?, high, low, rh));
    }
    Ok(days)
}

/// Parse an Open-Meteo forecast response with daily highs/lows and hourly
/// relative humidity.
pub fn parse_forecast_response(text: &str) -> Result<Vec<DailyWeather>, ApiError> {
    parse_daily(text, true)
}

/// Parse an Open-Meteo archive response. Archive days carry the default
/// humidity.
pub fn parse_archive_response(text: &str) -> Result<Vec<DailyWeather>, ApiError> {
    parse_daily(text, false)
}

/// One entry per day of the month. Later entries in `days` win over earlier
/// ones for the same date; days with no data get the fallback placeholder.
pub fn complete_month(
    year: i32,
    month: u32,
    days: &[DailyWeather],
) -> Result<Vec<DailyWeather>, ValidationError> {
    let n = days_in_month(year, month)?;
    let by_day: BTreeMap<u32, DailyWeather> = days
        .iter()
        .filter(|d| d.date.year() == year && d.date.month() == month)
        .map(|d| (d.date.day(), *d))
        .collect();

    let mut filled = 0;
    let month_days: Vec<DailyWeather> = (1..=n)
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .map(|date| {
            by_day.get(&date.day()).copied().unwrap_or_else(|| {
                filled += 1;
                DailyWeather::fallback(date)
            })
        })
        .collect();
    if filled > 0 {
        debug!(year, month, filled, "filled missing weather days");
    }
    Ok(month_days)
}

/// Heating and cooling degree days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DegreeDays {
    pub heating: f64,
    pub cooling: f64,
}

/// Degree days against `base_f` using each day's average temperature.
pub fn degree_days(days: &[DailyWeather], base_f: f64) -> DegreeDays {
    days.iter().fold(DegreeDays::default(), |acc, d| DegreeDays {
        heating: acc.heating + (base_f - d.avg_f).max(0.0),
        cooling: acc.cooling + (d.avg_f - base_f).max(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn hourly_profile_extremes() {
        assert!((hourly_temp(30.0, 50.0, 40.0, 6) - 30.0).abs() < 1e-9);
        assert!((hourly_temp(30.0, 50.0, 40.0, 18) - 50.0).abs() < 1e-9);
        assert!((hourly_temp(30.0, 50.0, 40.0, 12) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap(), 28);
        assert_eq!(days_in_month(2024, 12).unwrap(), 31);
        assert!(matches!(days_in_month(2024, 13), Err(ValidationError::InvalidMonth(13))));
    }

    #[test]
    fn forecast_humidity_is_daily_mean() {
        let body = indoc! {r#"
            {
              "daily": {
                "time": ["2024-01-10", "2024-01-11", "2024-01-12"],
                "temperature_2m_max": [40.0, 42.0, null],
                "temperature_2m_min": [20.0, 30.0, 25.0]
              },
              "hourly": {
                "time": ["2024-01-10T00:00", "2024-01-10T01:00", "2024-01-11T00:00"],
                "relativehumidity_2m": [80, 90, null]
              }
            }
        "#};
        let days = parse_forecast_response(body).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date(2024, 1, 10));
        assert_eq!(days[0].avg_f, 30.0);
        assert_eq!(days[0].humidity_pct, 85.0);
        assert_eq!(days[1].humidity_pct, DEFAULT_HUMIDITY_PCT);
    }

    #[test]
    fn archive_uses_default_humidity() {
        let body = r#"{"daily":{"time":["2024-01-01"],"temperature_2m_max":[35.5],"temperature_2m_min":[20.5]}}"#;
        let days = parse_archive_response(body).unwrap();
        assert_eq!(days[0].humidity_pct, DEFAULT_HUMIDITY_PCT);
        assert_eq!(days[0].avg_f, 28.0);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(matches!(
            parse_forecast_response("{\"hourly\":{}}"),
            Err(ApiError::Malformed { .. })
        ));
    }

    #[test]
    fn complete_month_fills_gaps_and_prefers_later_entries() {
        let forecast = DailyWeather::new(date(2024, 2, 3), 40.0, 30.0, 70.0);
        let archive = DailyWeather::new(date(2024, 2, 3), 44.0, 28.0, 60.0);
        let other_month = DailyWeather::new(date(2024, 3, 1), 60.0, 40.0, 50.0);
        let month = complete_month(2024, 2, &[forecast, archive, other_month]).unwrap();

        assert_eq!(month.len(), 29);
        assert_eq!(month[2], archive);
        assert_eq!(month[0].avg_f, FALLBACK_AVG_F);
        assert_eq!(month[28].date, date(2024, 2, 29));
    }

    #[test]
    fn degree_days_split_by_base() {
        let days = [
            DailyWeather::new(date(2024, 1, 1), 50.0, 30.0, 60.0),
            DailyWeather::new(date(2024, 1, 2), 80.0, 70.0, 60.0),
        ];
        let dd = degree_days(&days, 65.0);
        assert_eq!(dd.heating, 25.0);
        assert_eq!(dd.cooling, 10.0);
    }
}
