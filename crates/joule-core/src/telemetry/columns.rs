//! Header classification for thermostat exports.
//!
//! Vendors name their columns differently ("Current Temp (F)",
//! "Thermostat Temperature", "Heat Stage 1 (sec)", "Aux Heat 1 (sec)"), so
//! each header cell is matched against keyword rules rather than exact names.

use serde::{Deserialize, Serialize};

/// Meaning of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Date,
    Time,
    DateTime,
    OutdoorTemp,
    IndoorTemp,
    HeatRuntime,
    AuxRuntime,
    CoolRuntime,
    HeatSetpoint,
    CoolSetpoint,
    Humidity,
}

/// Column indices resolved from a header row. The first column matching a
/// role wins; later matches (e.g. "Heat Stage 2") are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub time: Option<usize>,
    pub date_time: Option<usize>,
    pub outdoor_temp: Option<usize>,
    pub indoor_temp: Option<usize>,
    pub heat_runtime: Option<usize>,
    pub aux_runtime: Option<usize>,
    pub cool_runtime: Option<usize>,
    pub heat_setpoint: Option<usize>,
    pub cool_setpoint: Option<usize>,
    pub humidity: Option<usize>,
    /// Indices of temperature columns whose header declares Celsius.
    #[serde(default)]
    pub celsius: Vec<usize>,
}

impl ColumnMap {
    /// Build a map from raw header cells.
    pub fn from_header(cells: &[String]) -> Self {
        let mut map = ColumnMap::default();
        for (idx, cell) in cells.iter().enumerate() {
            let Some(role) = classify_header(cell) else {
                continue;
            };
            let slot = map.slot_mut(role);
            if slot.is_none() {
                *slot = Some(idx);
                if is_temperature_role(role) && is_celsius_header(cell) {
                    map.celsius.push(idx);
                }
            }
        }
        map
    }

    /// True when rows can be timestamped with this header.
    pub fn has_timestamp(&self) -> bool {
        self.date_time.is_some() || (self.date.is_some() && self.time.is_some())
    }

    pub fn is_celsius(&self, idx: usize) -> bool {
        self.celsius.contains(&idx)
    }

    fn slot_mut(&mut self, role: ColumnRole) -> &mut Option<usize> {
        match role {
            ColumnRole::Date => &mut self.date,
            ColumnRole::Time => &mut self.time,
            ColumnRole::DateTime => &mut self.date_time,
            ColumnRole::OutdoorTemp => &mut self.outdoor_temp,
            ColumnRole::IndoorTemp => &mut self.indoor_temp,
            ColumnRole::HeatRuntime => &mut self.heat_runtime,
            ColumnRole::AuxRuntime => &mut self.aux_runtime,
            ColumnRole::CoolRuntime => &mut self.cool_runtime,
            ColumnRole::HeatSetpoint => &mut self.heat_setpoint,
            ColumnRole::CoolSetpoint => &mut self.cool_setpoint,
            ColumnRole::Humidity => &mut self.humidity,
        }
    }
}

fn is_temperature_role(role: ColumnRole) -> bool {
    matches!(
        role,
        ColumnRole::OutdoorTemp
            | ColumnRole::IndoorTemp
            | ColumnRole::HeatSetpoint
            | ColumnRole::CoolSetpoint
    )
}

fn is_celsius_header(cell: &str) -> bool {
    let lower = cell.to_lowercase();
    lower.contains("(c)")
        || lower.contains("[c]")
        || lower.contains("°c")
        || lower.contains("celsius")
}

/// Classify one header cell. Order matters: setpoints and aux heat must be
/// recognized before the generic heat/temperature rules.
pub fn classify_header(cell: &str) -> Option<ColumnRole> {
    let name = cell.trim().trim_matches('"').to_lowercase();
    if name.is_empty() {
        return None;
    }

    let has = |needle: &str| name.contains(needle);

    if has("humidity") {
        // Outdoor humidity is not used by the estimators.
        return if has("outdoor") || has("outside") {
            None
        } else {
            Some(ColumnRole::Humidity)
        };
    }

    if has("set") && (has("temp") || has("point")) {
        if has("heat") {
            return Some(ColumnRole::HeatSetpoint);
        }
        if has("cool") {
            return Some(ColumnRole::CoolSetpoint);
        }
        return None;
    }

    if has("aux") || has("emergency") || has("backup heat") {
        return Some(ColumnRole::AuxRuntime);
    }

    if has("heat") {
        if has("stage") || has("pump") || has("runtime") || has("sec") || has("heating") {
            return Some(ColumnRole::HeatRuntime);
        }
        return None;
    }

    if has("cool") {
        if has("stage") || has("compressor") || has("runtime") || has("sec") || has("cooling") {
            return Some(ColumnRole::CoolRuntime);
        }
        return None;
    }

    if has("outdoor") || has("outside") {
        return if has("temp") {
            Some(ColumnRole::OutdoorTemp)
        } else {
            None
        };
    }

    if has("temp")
        && (has("current") || has("indoor") || has("thermostat") || has("inside") || has("zone"))
    {
        return Some(ColumnRole::IndoorTemp);
    }

    if has("timestamp") || (has("date") && has("time")) {
        return Some(ColumnRole::DateTime);
    }

    if name.starts_with("date") || name == "day" {
        return Some(ColumnRole::Date);
    }

    if name.starts_with("time") {
        return Some(ColumnRole::Time);
    }

    None
}
