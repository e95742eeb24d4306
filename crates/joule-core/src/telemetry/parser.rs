//! Heuristic CSV parser for thermostat runtime exports.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use super::columns::ColumnMap;
use super::{ParseReport, TelemetryLog, ThermostatRow};
use crate::error::TelemetryError;

/// Maximum number of skip reasons kept in the report.
const MAX_WARNINGS: usize = 10;

/// `%y` comes before `%Y`: chrono's `%Y` also takes a two-digit year and
/// would read `01/15/24` as 0024.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d"];
const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S",
    "%H:%M:%S%.f",
    "%H:%M",
    "%I:%M:%S %p",
    "%I:%M %p",
    "%I:%M:%S%p",
    "%I:%M%p",
];

/// Parse a thermostat export into a time-ordered log.
///
/// Preamble lines (vendor banners, `#` comments, blank lines) are skipped
/// until a header with a usable timestamp column appears. Rows with an
/// unparseable timestamp are skipped and reported rather than failing the
/// whole file.
///
/// # Errors
/// Returns [`TelemetryError`] if no header is found, the header lacks a
/// date/time column, or no data rows survive.
pub fn parse_thermostat_csv(text: &str) -> Result<TelemetryLog, TelemetryError> {
    let text = text.trim_start_matches('\u{feff}');
    let mut lines = text.lines().enumerate();

    let mut header: Option<(usize, Vec<String>, ColumnMap)> = None;
    let mut first_candidate: Option<String> = None;
    for (line_no, line) in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let cells = split_csv_line(trimmed);
        let map = ColumnMap::from_header(&cells);
        if map.has_timestamp() {
            header = Some((line_no, cells, map));
            break;
        }
        if cells.len() > 1 && first_candidate.is_none() && map != ColumnMap::default() {
            first_candidate = Some(trimmed.to_string());
        }
    }

    let Some((header_line, header_cells, columns)) = header else {
        return Err(match first_candidate {
            Some(candidate) => TelemetryError::MissingTimestamp(candidate),
            None => TelemetryError::NoHeader,
        });
    };
    debug!(header_line, columns = header_cells.len(), "thermostat CSV header found");

    let mut report = ParseReport {
        header_line: header_line + 1,
        columns: columns.clone(),
        ..ParseReport::default()
    };

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        report.total_rows += 1;
        let cells = split_csv_line(trimmed);
        match parse_row(&cells, &columns) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                report.skipped_rows += 1;
                if report.warnings.len() < MAX_WARNINGS {
                    report.warnings.push(format!("line {}: {reason}", line_no + 1));
                }
            }
        }
    }

    rows.sort_by_key(|r| r.timestamp);
    let before = rows.len();
    rows.dedup_by_key(|r| r.timestamp);
    report.duplicate_rows = before - rows.len();
    report.parsed_rows = rows.len();

    if rows.is_empty() {
        return Err(TelemetryError::NoRows {
            skipped: report.skipped_rows,
        });
    }
    if report.skipped_rows > 0 {
        warn!(
            skipped = report.skipped_rows,
            parsed = report.parsed_rows,
            "some thermostat rows were skipped"
        );
    }

    Ok(TelemetryLog { rows, report })
}

fn parse_row(cells: &[String], columns: &ColumnMap) -> Result<ThermostatRow, String> {
    let timestamp = row_timestamp(cells, columns)?;

    let temp = |idx: Option<usize>| -> Option<f64> {
        let idx = idx?;
        let value = parse_number(cells.get(idx)?)?;
        Some(if columns.is_celsius(idx) {
            value * 9.0 / 5.0 + 32.0
        } else {
            value
        })
    };
    let runtime = |idx: Option<usize>| -> f64 {
        idx.and_then(|i| cells.get(i))
            .and_then(|c| parse_number(c))
            .map(|v| v.max(0.0))
            .unwrap_or(0.0)
    };

    Ok(ThermostatRow {
        timestamp,
        outdoor_temp_f: temp(columns.outdoor_temp),
        indoor_temp_f: temp(columns.indoor_temp),
        heat_runtime_s: runtime(columns.heat_runtime),
        aux_runtime_s: runtime(columns.aux_runtime),
        cool_runtime_s: runtime(columns.cool_runtime),
        heat_setpoint_f: temp(columns.heat_setpoint),
        cool_setpoint_f: temp(columns.cool_setpoint),
        humidity: columns
            .humidity
            .and_then(|i| cells.get(i))
            .and_then(|c| parse_number(c)),
    })
}

fn row_timestamp(cells: &[String], columns: &ColumnMap) -> Result<NaiveDateTime, String> {
    if let (Some(d), Some(t)) = (columns.date, columns.time) {
        let date_cell = cells.get(d).map(String::as_str).unwrap_or("");
        let time_cell = cells.get(t).map(String::as_str).unwrap_or("");
        let date = parse_date(date_cell).ok_or_else(|| format!("bad date '{date_cell}'"))?;
        let time = parse_time(time_cell).ok_or_else(|| format!("bad time '{time_cell}'"))?;
        return Ok(date.and_time(time));
    }
    if let Some(dt) = columns.date_time {
        let cell = cells.get(dt).map(String::as_str).unwrap_or("");
        return parse_date_time(cell).ok_or_else(|| format!("bad timestamp '{cell}'"));
    }
    Err("no timestamp column".to_string())
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

pub(crate) fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim().to_uppercase();
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(&s, f).ok())
}

/// Parse a combined timestamp such as `2024-01-05 13:05:00`,
/// `2024-01-05T13:05`, `01/05/2024 1:05 PM` or RFC 3339.
pub(crate) fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    let (date_part, time_part) = match s.find(|c: char| c == 'T' || c == ' ') {
        Some(pos) => (&s[..pos], &s[pos + 1..]),
        None => (s, ""),
    };
    let date = parse_date(date_part)?;
    if time_part.trim().is_empty() {
        return date.and_hms_opt(0, 0, 0);
    }
    let time = parse_time(time_part)?;
    Some(date.and_time(time))
}

/// Parse a numeric cell, tolerating units and percent signs.
pub(crate) fn parse_number(cell: &str) -> Option<f64> {
    let cleaned = cell
        .trim()
        .trim_end_matches('%')
        .trim_end_matches("°F")
        .trim_end_matches("°C")
        .trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Split one CSV line, honoring double-quoted fields with embedded commas
/// and doubled quotes.
pub(crate) fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}
