//! HVAC equipment performance models.
//!
//! - [`HeatPump`]: capacity derate, HSPF2-scaled COP, defrost penalty
//! - [`Furnace`]: gas furnace fuel use from AFUE
//! - [`AirConditioner`]: cooling electricity from SEER2

mod heat_pump;

pub use heat_pump::{
    base_cop, base_seasonal_cop, capacity_factor, cop, defrost_penalty, HeatPump, HourlyEnergy,
    DEFAULT_CUTOFF_F, HSPF2_BIN_HOURS,
};

use serde::{Deserialize, Serialize};

pub const BTU_PER_KWH: f64 = 3412.14;
pub const BTU_PER_TON: f64 = 12_000.0;
pub const BTU_PER_THERM: f64 = 100_000.0;

/// Primary heating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrimarySystem {
    #[default]
    HeatPump,
    GasFurnace,
    ElectricResistance,
}

impl std::fmt::Display for PrimarySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimarySystem::HeatPump => write!(f, "heat_pump"),
            PrimarySystem::GasFurnace => write!(f, "gas_furnace"),
            PrimarySystem::ElectricResistance => write!(f, "electric_resistance"),
        }
    }
}

/// Gas furnace rated by annual fuel utilization efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Furnace {
    /// 0-1, e.g. 0.95
    pub afue: f64,
}

impl Furnace {
    /// Therms of gas burned to deliver `load_btu`.
    pub fn therms_for(&self, load_btu: f64) -> f64 {
        if load_btu <= 0.0 || self.afue <= 0.0 {
            return 0.0;
        }
        load_btu / (self.afue * BTU_PER_THERM)
    }
}

/// Central air conditioner (or heat pump in cooling mode).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirConditioner {
    /// Seasonal efficiency in BTU per watt-hour
    pub seer2: f64,
}

impl AirConditioner {
    /// Electricity needed to remove `load_btu` of heat.
    pub fn kwh_for(&self, load_btu: f64) -> f64 {
        if load_btu <= 0.0 || self.seer2 <= 0.0 {
            return 0.0;
        }
        load_btu / (self.seer2 * 1000.0)
    }

    /// Electricity to hold `indoor_temp` for `dt_hours` against a building
    /// with heat-loss factor `ua` (BTU/hr/°F).
    pub fn cooling_step(&self, indoor_temp: f64, outdoor_temp: f64, ua: f64, dt_hours: f64) -> f64 {
        let gain = ua.max(0.0) * (outdoor_temp - indoor_temp).max(0.0);
        self.kwh_for(gain * dt_hours)
    }
}

/// Electricity for resistance heat delivering `load_btu`.
pub fn resistance_kwh(load_btu: f64) -> f64 {
    load_btu.max(0.0) / BTU_PER_KWH
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn furnace_and_ac_conversions() {
        let furnace = Furnace { afue: 0.8 };
        assert!((furnace.therms_for(80_000.0) - 1.0).abs() < 1e-12);
        assert_eq!(furnace.therms_for(-5.0), 0.0);

        let ac = AirConditioner { seer2: 16.0 };
        assert!((ac.kwh_for(16_000.0) - 1.0).abs() < 1e-12);
        // 400 BTU/hr/°F * 20 °F = 8,000 BTU/hr
        assert!((ac.cooling_step(75.0, 95.0, 400.0, 2.0) - 1.0).abs() < 1e-12);
        assert_eq!(ac.cooling_step(75.0, 70.0, 400.0, 1.0), 0.0);
        assert!((resistance_kwh(BTU_PER_KWH) - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn capacity_factor_stays_in_unit_interval(t in -60.0f64..120.0) {
            let f = capacity_factor(t, DEFAULT_CUTOFF_F);
            prop_assert!((0.0..=1.0).contains(&f));
        }

        #[test]
        fn capacity_never_rises_when_colder(t in -14.0f64..100.0, drop in 0.0f64..30.0) {
            let warm = capacity_factor(t, DEFAULT_CUTOFF_F);
            let cold = capacity_factor(t - drop, DEFAULT_CUTOFF_F);
            prop_assert!(cold <= warm + 1e-12);
        }

        #[test]
        fn defrost_penalty_is_bounded(t in -40.0f64..100.0, rh in 0.0f64..100.0) {
            let p = defrost_penalty(t, rh);
            prop_assert!((1.0..=2.0).contains(&p));
        }

        #[test]
        fn cop_scales_linearly_with_rating(t in -30.0f64..80.0, hspf2 in 6.0f64..13.0) {
            let ratio = cop(t, hspf2) / cop(t, 7.0);
            prop_assert!((ratio - hspf2 / 7.0).abs() < 1e-9);
        }

        #[test]
        fn heat_pump_energy_is_non_negative(
            indoor in 55.0f64..80.0,
            outdoor in -30.0f64..90.0,
            rh in 0.0f64..100.0,
            design in 0.0f64..120_000.0,
        ) {
            let e = HeatPump::default().heating_step(indoor, outdoor, rh, design, 1.0);
            prop_assert!(e.hp_kwh >= 0.0);
            prop_assert!(e.aux_kwh >= 0.0);
        }
    }
}
