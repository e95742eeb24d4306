use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{heating_hour, round1, ForecastSettings};
use crate::building::{round2, DESIGN_DELTA_T_F};
use crate::error::ValidationError;
use crate::rebates::payback_years;
use crate::weather::{days_in_month, hourly_temp, DailyWeather, DEFAULT_HUMIDITY_PCT};

/// Non-leap reference year for month lengths.
const REFERENCE_YEAR: i32 = 2023;

/// Typical weather for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthNormal {
    pub month: u32,
    pub high_f: f64,
    pub low_f: f64,
    #[serde(default = "default_humidity")]
    pub humidity_pct: f64,
}

fn default_humidity() -> f64 {
    DEFAULT_HUMIDITY_PCT
}

/// Average daily highs, lows and humidity per calendar month.
pub fn normals_from_daily(days: &[DailyWeather]) -> Vec<MonthNormal> {
    let mut acc: BTreeMap<u32, (f64, f64, f64, usize)> = BTreeMap::new();
    for d in days {
        let e = acc.entry(d.date.month()).or_insert((0.0, 0.0, 0.0, 0));
        e.0 += d.high_f;
        e.1 += d.low_f;
        e.2 += d.humidity_pct;
        e.3 += 1;
    }
    acc.into_iter()
        .map(|(month, (high, low, rh, n))| {
            let n = n as f64;
            MonthNormal {
                month,
                high_f: round1(high / n),
                low_f: round1(low / n),
                humidity_pct: round1(rh / n),
            }
        })
        .collect()
}

/// Overrides applied on top of the configured settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Assumptions {
    /// Added to every normal high and low
    pub temp_offset_f: f64,
    /// Multiplies electricity and gas prices
    pub rate_multiplier: f64,
    pub hspf2: Option<f64>,
    pub seer2: Option<f64>,
    pub tons: Option<f64>,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            temp_offset_f: 0.0,
            rate_multiplier: 1.0,
            hspf2: None,
            seer2: None,
            tons: None,
        }
    }
}

impl Assumptions {
    fn apply(&self, settings: &ForecastSettings) -> ForecastSettings {
        let mut s = settings.clone();
        if let Some(hspf2) = self.hspf2 {
            s.heat_pump.hspf2 = hspf2;
        }
        if let Some(tons) = self.tons {
            s.heat_pump.tons = tons;
        }
        if let Some(seer2) = self.seer2 {
            s.air_conditioner.seer2 = seer2;
        }
        s.electricity_rate *= self.rate_multiplier;
        s.gas_rate *= self.rate_multiplier;
        if let Some(schedule) = s.rate_schedule.as_mut() {
            schedule.scale_energy_rates(self.rate_multiplier);
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthProjection {
    pub month: u32,
    pub heating_kwh: f64,
    pub aux_kwh: f64,
    pub cooling_kwh: f64,
    pub gas_therms: f64,
    pub heating_cost: f64,
    pub cooling_cost: f64,
    pub baseload_cost: f64,
    pub fixed_cost: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualProjection {
    pub months: Vec<MonthProjection>,
    pub heating_cost: f64,
    pub cooling_cost: f64,
    pub total_kwh: f64,
    pub gas_therms: f64,
    pub total_cost: f64,
}

/// Twelve synthesized months, heating and cooling hour by hour against the
/// day/night setpoints.
///
/// # Errors
/// Every calendar month must appear exactly once in `normals`.
pub fn annual_projection(
    normals: &[MonthNormal],
    settings: &ForecastSettings,
    assumptions: &Assumptions,
) -> Result<AnnualProjection, ValidationError> {
    let by_month: BTreeMap<u32, &MonthNormal> = normals.iter().map(|n| (n.month, n)).collect();
    if normals.len() != 12 || by_month.len() != 12 || by_month.keys().any(|m| !(1..=12).contains(m)) {
        return Err(ValidationError::InvalidValue {
            field: "normals".to_string(),
            message: format!("need one entry per month 1-12, got {}", normals.len()),
        });
    }

    let s = assumptions.apply(settings);
    let (design_heat_loss, _) = s.design_heat_loss();
    let ua = design_heat_loss / DESIGN_DELTA_T_F;

    let mut months = Vec::with_capacity(12);
    for (&month, normal) in &by_month {
        let days = days_in_month(REFERENCE_YEAR, month)? as f64;
        let high = normal.high_f + assumptions.temp_offset_f;
        let low = normal.low_f + assumptions.temp_offset_f;
        let avg = (high + low) / 2.0;

        let (mut hp, mut aux, mut therms, mut cool) = (0.0, 0.0, 0.0, 0.0);
        for hour in 0..24 {
            let t = hourly_temp(low, high, avg, hour);
            let h = heating_hour(&s, design_heat_loss, s.heating_setpoint(hour), t, normal.humidity_pct);
            hp += h.hp_kwh;
            aux += h.aux_kwh;
            therms += h.therms;
            cool += s
                .air_conditioner
                .cooling_step(s.cooling_setpoint(hour), t, ua, 1.0);
        }
        let (hp, aux, therms, cool) = (hp * days, aux * days, therms * days, cool * days);

        let hvac_kwh = hp + aux + cool;
        let (electric_hvac, baseload_cost, fixed_cost) =
            s.price_electricity(hvac_kwh, s.baseload() * days, month);
        let (heating_electric, cooling_cost) = if hvac_kwh > 0.0 {
            let heat_share = (hp + aux) / hvac_kwh;
            (electric_hvac * heat_share, electric_hvac * (1.0 - heat_share))
        } else {
            (0.0, 0.0)
        };
        let heating_cost = heating_electric + therms * s.gas_rate;

        months.push(MonthProjection {
            month,
            heating_kwh: round1(hp),
            aux_kwh: round1(aux),
            cooling_kwh: round1(cool),
            gas_therms: round1(therms),
            heating_cost: round2(heating_cost),
            cooling_cost: round2(cooling_cost),
            baseload_cost: round2(baseload_cost),
            fixed_cost: round2(fixed_cost),
            total_cost: round2(heating_cost + cooling_cost + baseload_cost + fixed_cost),
        });
    }

    let sum = |f: fn(&MonthProjection) -> f64| months.iter().map(f).sum::<f64>();
    let projection = AnnualProjection {
        heating_cost: round2(sum(|m| m.heating_cost)),
        cooling_cost: round2(sum(|m| m.cooling_cost)),
        total_kwh: round1(sum(|m| m.heating_kwh + m.aux_kwh + m.cooling_kwh)),
        gas_therms: round1(sum(|m| m.gas_therms)),
        total_cost: round2(sum(|m| m.total_cost)),
        months,
    };
    debug!(total = projection.total_cost, "annual projection");
    Ok(projection)
}

/// A named alternative to price against the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub assumptions: Assumptions,
    /// Up-front cost, dollars
    #[serde(default)]
    pub upgrade_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub name: String,
    pub annual_cost: f64,
    pub annual_savings: f64,
    pub payback_years: Option<f64>,
}

/// Annual cost of each candidate and its savings over `baseline`.
pub fn compare_scenarios(
    normals: &[MonthNormal],
    settings: &ForecastSettings,
    baseline: &Assumptions,
    candidates: &[Scenario],
) -> Result<Vec<ScenarioComparison>, ValidationError> {
    let base = annual_projection(normals, settings, baseline)?.total_cost;
    candidates
        .iter()
        .map(|c| {
            let cost = annual_projection(normals, settings, &c.assumptions)?.total_cost;
            let savings = round2(base - cost);
            Ok(ScenarioComparison {
                name: c.name.clone(),
                annual_cost: cost,
                annual_savings: savings,
                payback_years: if c.upgrade_cost > 0.0 {
                    payback_years(c.upgrade_cost, savings)
                } else {
                    None
                },
            })
        })
        .collect()
}
