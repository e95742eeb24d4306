//! Energy cost projection.
//!
//! [`monthly_forecast`] prices one month of daily weather hour by hour;
//! [`annual_projection`] does the same for twelve months of climate normals
//! and [`compare_scenarios`] prices equipment or setpoint alternatives
//! against a baseline.

mod annual;

pub use annual::{
    annual_projection, compare_scenarios, normals_from_daily, AnnualProjection, Assumptions,
    MonthNormal, MonthProjection, Scenario, ScenarioComparison,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::building::{
    resolve_heat_loss, round2, BuildingProfile, HeatLossOverrides, HeatLossSource,
    DESIGN_DELTA_T_F,
};
use crate::equipment::{resistance_kwh, AirConditioner, Furnace, HeatPump, PrimarySystem};
use crate::error::ValidationError;
use crate::rates::RateSchedule;
use crate::weather::DailyWeather;

/// Baseload is clamped to this range, kWh/day.
pub const BASELOAD_MIN_KWH: f64 = 5.0;
pub const BASELOAD_MAX_KWH: f64 = 25.0;
/// Average weeks per month used for the weekly figure.
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Day setpoint applies from 06:00 to 22:00.
const DAY_HOURS: std::ops::Range<u32> = 6..22;

/// Everything about the home, equipment and prices that a forecast needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSettings {
    pub building: BuildingProfile,
    pub heat_loss: HeatLossOverrides,
    pub primary_system: PrimarySystem,
    pub heat_pump: HeatPump,
    pub furnace: Furnace,
    pub air_conditioner: AirConditioner,
    pub use_electric_aux_heat: bool,
    pub winter_day_f: f64,
    pub winter_night_f: f64,
    pub summer_day_f: f64,
    pub summer_night_f: f64,
    /// $/kWh
    pub electricity_rate: f64,
    /// $/month
    pub fixed_monthly_charge: f64,
    /// $/therm
    pub gas_rate: f64,
    pub baseload_kwh_per_day: f64,
    /// Replaces the flat rate and fixed charge when present
    pub rate_schedule: Option<RateSchedule>,
    pub location: Option<String>,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            building: BuildingProfile::default(),
            heat_loss: HeatLossOverrides::default(),
            primary_system: PrimarySystem::HeatPump,
            heat_pump: HeatPump::default(),
            furnace: Furnace { afue: 0.95 },
            air_conditioner: AirConditioner { seer2: 15.0 },
            use_electric_aux_heat: true,
            winter_day_f: 70.0,
            winter_night_f: 68.0,
            summer_day_f: 75.0,
            summer_night_f: 72.0,
            electricity_rate: 0.10,
            fixed_monthly_charge: 0.0,
            gas_rate: 1.20,
            baseload_kwh_per_day: 10.0,
            rate_schedule: None,
            location: None,
        }
    }
}

impl ForecastSettings {
    pub fn design_heat_loss(&self) -> (f64, HeatLossSource) {
        resolve_heat_loss(&self.building, &self.heat_loss)
    }

    pub(crate) fn baseload(&self) -> f64 {
        self.baseload_kwh_per_day
            .clamp(BASELOAD_MIN_KWH, BASELOAD_MAX_KWH)
    }

    /// Heating setpoint weighted 16 h day / 8 h night.
    pub fn weighted_winter_setpoint(&self) -> f64 {
        self.winter_day_f * (16.0 / 24.0) + self.winter_night_f * (8.0 / 24.0)
    }

    pub(crate) fn heating_setpoint(&self, hour: u32) -> f64 {
        if DAY_HOURS.contains(&hour) {
            self.winter_day_f
        } else {
            self.winter_night_f
        }
    }

    pub(crate) fn cooling_setpoint(&self, hour: u32) -> f64 {
        if DAY_HOURS.contains(&hour) {
            self.summer_day_f
        } else {
            self.summer_night_f
        }
    }

    /// Split an electric bill into (hvac, baseload, fixed) dollars.
    pub(crate) fn price_electricity(
        &self,
        hvac_kwh: f64,
        baseload_kwh: f64,
        month: u32,
    ) -> (f64, f64, f64) {
        match &self.rate_schedule {
            Some(schedule) => {
                let total_kwh = hvac_kwh + baseload_kwh;
                let fixed = schedule.fixed_monthly_charge;
                let energy = schedule.monthly_cost(total_kwh, month) - fixed;
                let hvac_share = if total_kwh > 0.0 { hvac_kwh / total_kwh } else { 0.0 };
                (energy * hvac_share, energy * (1.0 - hvac_share), fixed)
            }
            None => (
                hvac_kwh * self.electricity_rate,
                baseload_kwh * self.electricity_rate,
                self.fixed_monthly_charge,
            ),
        }
    }
}

/// Heating energy for one hour split by source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct HeatingHour {
    pub hp_kwh: f64,
    pub aux_kwh: f64,
    pub therms: f64,
}

pub(crate) fn heating_hour(
    settings: &ForecastSettings,
    design_heat_loss: f64,
    indoor: f64,
    outdoor: f64,
    humidity: f64,
) -> HeatingHour {
    match settings.primary_system {
        PrimarySystem::HeatPump => {
            let e = settings
                .heat_pump
                .heating_step(indoor, outdoor, humidity, design_heat_loss, 1.0);
            HeatingHour {
                hp_kwh: e.hp_kwh,
                aux_kwh: if settings.use_electric_aux_heat { e.aux_kwh } else { 0.0 },
                therms: 0.0,
            }
        }
        PrimarySystem::ElectricResistance => HeatingHour {
            aux_kwh: resistance_kwh(hourly_load(design_heat_loss, indoor, outdoor)),
            ..HeatingHour::default()
        },
        PrimarySystem::GasFurnace => HeatingHour {
            therms: settings
                .furnace
                .therms_for(hourly_load(design_heat_loss, indoor, outdoor)),
            ..HeatingHour::default()
        },
    }
}

fn hourly_load(design_heat_loss: f64, indoor: f64, outdoor: f64) -> f64 {
    design_heat_loss.max(0.0) / DESIGN_DELTA_T_F * (indoor - outdoor).max(0.0)
}

/// One month's heating cost forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyForecast {
    pub year: i32,
    pub month: u32,
    pub days: usize,
    pub location: String,
    pub primary_system: PrimarySystem,
    pub heat_loss_source: HeatLossSource,
    /// BTU/hr at a 70 °F difference
    pub design_heat_loss_btu_hr: f64,
    pub target_temp_f: f64,
    pub night_temp_f: f64,
    pub total_energy_kwh: f64,
    pub hp_energy_kwh: f64,
    pub aux_energy_kwh: f64,
    pub gas_therms: f64,
    pub hvac_cost: f64,
    pub baseload_cost: f64,
    pub fixed_cost: f64,
    pub variable_cost: f64,
    pub total_monthly_cost: f64,
    pub weekly_cost: f64,
    pub electricity_rate: f64,
}

/// Price a month of heating from daily weather.
///
/// Every hour uses the cosine temperature profile for its day and the
/// 16/8 weighted winter setpoint.
pub fn monthly_forecast(
    days: &[DailyWeather],
    settings: &ForecastSettings,
    year: i32,
    month: u32,
) -> Result<MonthlyForecast, ValidationError> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::InvalidMonth(month));
    }
    if days.is_empty() {
        return Err(ValidationError::EmptyCollection("weather days".to_string()));
    }

    let (design_heat_loss, source) = settings.design_heat_loss();
    let indoor = settings.weighted_winter_setpoint();

    let mut hp_kwh = 0.0;
    let mut aux_kwh = 0.0;
    let mut therms = 0.0;
    for day in days {
        for hour in 0..24 {
            let h = heating_hour(settings, design_heat_loss, indoor, day.temp_at(hour), day.humidity_pct);
            hp_kwh += h.hp_kwh;
            aux_kwh += h.aux_kwh;
            therms += h.therms;
        }
    }

    let total_kwh = hp_kwh + aux_kwh;
    let baseload_kwh = settings.baseload() * days.len() as f64;
    let (electric_hvac, baseload_cost, fixed_cost) =
        settings.price_electricity(total_kwh, baseload_kwh, month);
    let hvac_cost = electric_hvac + therms * settings.gas_rate;
    let total = hvac_cost + baseload_cost + fixed_cost;
    debug!(year, month, total_kwh, therms, total, "monthly forecast");

    Ok(MonthlyForecast {
        year,
        month,
        days: days.len(),
        location: settings
            .location
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        primary_system: settings.primary_system,
        heat_loss_source: source,
        design_heat_loss_btu_hr: design_heat_loss,
        target_temp_f: round2(indoor),
        night_temp_f: settings.winter_night_f,
        total_energy_kwh: round1(total_kwh),
        hp_energy_kwh: round1(hp_kwh),
        aux_energy_kwh: round1(aux_kwh),
        gas_therms: round1(therms),
        hvac_cost: round2(hvac_cost),
        baseload_cost: round2(baseload_cost),
        fixed_cost: round2(fixed_cost),
        variable_cost: round2(hvac_cost + baseload_cost),
        total_monthly_cost: round2(total),
        weekly_cost: round2(total / WEEKS_PER_MONTH),
        electricity_rate: settings.electricity_rate,
    })
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::complete_month;
    use chrono::NaiveDate;

    fn constant_month(temp: f64, days: u32) -> Vec<DailyWeather> {
        (1..=days)
            .map(|d| DailyWeather::new(NaiveDate::from_ymd_opt(2024, 1, d).unwrap(), temp, temp, 50.0))
            .collect()
    }

    #[test]
    fn mild_month_is_only_baseload_and_fixed() {
        let settings = ForecastSettings {
            fixed_monthly_charge: 12.0,
            ..ForecastSettings::default()
        };
        let f = monthly_forecast(&constant_month(75.0, 30), &settings, 2024, 1).unwrap();
        assert_eq!(f.total_energy_kwh, 0.0);
        assert_eq!(f.hvac_cost, 0.0);
        // 10 kWh/day * 30 days * $0.10
        assert_eq!(f.baseload_cost, 30.0);
        assert_eq!(f.total_monthly_cost, 42.0);
        assert_eq!(f.weekly_cost, 9.7);
        assert_eq!(f.location, "Unknown");
    }

    #[test]
    fn baseload_is_clamped() {
        let settings = ForecastSettings {
            baseload_kwh_per_day: 100.0,
            ..ForecastSettings::default()
        };
        let f = monthly_forecast(&constant_month(75.0, 10), &settings, 2024, 1).unwrap();
        assert_eq!(f.baseload_cost, 25.0);
    }

    #[test]
    fn resistance_heat_matches_load() {
        let settings = ForecastSettings {
            primary_system: PrimarySystem::ElectricResistance,
            winter_day_f: 70.0,
            winter_night_f: 70.0,
            heat_loss: HeatLossOverrides {
                use_manual: true,
                manual_factor: 500.0,
                ..HeatLossOverrides::default()
            },
            ..ForecastSettings::default()
        };
        let f = monthly_forecast(&constant_month(40.0, 1), &settings, 2024, 1).unwrap();
        // 500 BTU/hr/°F * 30 °F * 24 h / 3412.14
        let expected = 500.0 * 30.0 * 24.0 / crate::equipment::BTU_PER_KWH;
        assert!((f.aux_energy_kwh - expected).abs() < 0.1);
        assert_eq!(f.heat_loss_source, HeatLossSource::Manual);
        assert_eq!(f.design_heat_loss_btu_hr, 35_000.0);
    }

    #[test]
    fn gas_furnace_priced_in_therms() {
        let settings = ForecastSettings {
            primary_system: PrimarySystem::GasFurnace,
            furnace: Furnace { afue: 1.0 },
            gas_rate: 1.0,
            winter_day_f: 70.0,
            winter_night_f: 70.0,
            heat_loss: HeatLossOverrides {
                use_manual: true,
                manual_factor: 500.0,
                ..HeatLossOverrides::default()
            },
            ..ForecastSettings::default()
        };
        let f = monthly_forecast(&constant_month(40.0, 1), &settings, 2024, 1).unwrap();
        // 360,000 BTU = 3.6 therms
        assert_eq!(f.gas_therms, 3.6);
        assert_eq!(f.total_energy_kwh, 0.0);
        assert_eq!(f.hvac_cost, 3.6);
    }

    #[test]
    fn disabling_aux_drops_deficit() {
        let cold = constant_month(-20.0, 2);
        let with_aux = monthly_forecast(&cold, &ForecastSettings::default(), 2024, 1).unwrap();
        let without = monthly_forecast(
            &cold,
            &ForecastSettings {
                use_electric_aux_heat: false,
                ..ForecastSettings::default()
            },
            2024,
            1,
        )
        .unwrap();
        assert!(with_aux.aux_energy_kwh > 0.0);
        assert_eq!(without.aux_energy_kwh, 0.0);
    }

    #[test]
    fn schedule_replaces_flat_rate() {
        let settings = ForecastSettings {
            rate_schedule: Some(RateSchedule::flat(0.20, 8.0)),
            ..ForecastSettings::default()
        };
        let f = monthly_forecast(&constant_month(75.0, 30), &settings, 2024, 1).unwrap();
        assert_eq!(f.baseload_cost, 60.0);
        assert_eq!(f.fixed_cost, 8.0);
    }

    #[test]
    fn validates_inputs() {
        let days = complete_month(2024, 1, &[]).unwrap();
        assert!(matches!(
            monthly_forecast(&days, &ForecastSettings::default(), 2024, 13),
            Err(ValidationError::InvalidMonth(13))
        ));
        assert!(matches!(
            monthly_forecast(&[], &ForecastSettings::default(), 2024, 1),
            Err(ValidationError::EmptyCollection(_))
        ));
    }

    #[test]
    fn colder_weather_costs_more() {
        let settings = ForecastSettings::default();
        let warm = monthly_forecast(&constant_month(45.0, 31), &settings, 2024, 1).unwrap();
        let cold = monthly_forecast(&constant_month(15.0, 31), &settings, 2024, 1).unwrap();
        assert!(cold.total_monthly_cost > warm.total_monthly_cost);
        assert!(cold.hp_energy_kwh > warm.hp_energy_kwh);
    }
}
