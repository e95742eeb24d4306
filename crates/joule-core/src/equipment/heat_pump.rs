//! Air-source heat pump performance curves.
//!
//! Capacity and COP are piecewise-linear in outdoor temperature with knees
//! at the 47 °F and 17 °F rating points. The COP curve is rescaled so that
//! its seasonal average over the standard HSPF2 bin hours matches the
//! unit's rated HSPF2.

use serde::{Deserialize, Serialize};

use super::{BTU_PER_KWH, BTU_PER_TON};

/// Outdoor temperature at or below which the compressor locks out.
pub const DEFAULT_CUTOFF_F: f64 = -15.0;

/// Standard HSPF2 heating bins: (bin temperature °F, hours).
pub const HSPF2_BIN_HOURS: [(f64, f64); 16] = [
    (62.0, 87.0),
    (57.0, 183.0),
    (52.0, 294.0),
    (47.0, 358.0),
    (42.0, 415.0),
    (37.0, 460.0),
    (33.0, 430.0),
    (28.0, 407.0),
    (23.0, 311.0),
    (18.0, 239.0),
    (13.0, 152.0),
    (8.0, 91.0),
    (3.0, 47.0),
    (-2.0, 20.0),
    (-7.0, 8.0),
    (-13.0, 3.0),
];

/// Fraction of nominal capacity available at an outdoor temperature.
pub fn capacity_factor(temp_out: f64, cutoff_temp: f64) -> f64 {
    if temp_out <= cutoff_temp {
        return 0.0;
    }
    if temp_out >= 47.0 {
        return 1.0;
    }
    if temp_out < 17.0 {
        return (0.64 - (17.0 - temp_out) * 0.01).max(0.0);
    }
    1.0 - (47.0 - temp_out) * 0.012
}

/// Shape of the COP curve before HSPF2 scaling.
pub fn base_cop(temp_out: f64) -> f64 {
    if temp_out >= 47.0 {
        return 4.8;
    }
    if temp_out >= 17.0 {
        return 4.8 - (47.0 - temp_out) * 0.0867;
    }
    (2.2 - (17.0 - temp_out) * 0.02).max(1.2)
}

/// Bin-hour weighted seasonal COP of the unscaled curve.
pub fn base_seasonal_cop() -> f64 {
    let weighted: f64 = HSPF2_BIN_HOURS.iter().map(|(t, h)| base_cop(*t) * h).sum();
    let hours: f64 = HSPF2_BIN_HOURS.iter().map(|(_, h)| h).sum();
    weighted / hours
}

/// COP at an outdoor temperature for a unit rated at `hspf2`.
pub fn cop(temp_out: f64, hspf2: f64) -> f64 {
    let target_seasonal = hspf2 * 1000.0 / BTU_PER_KWH;
    base_cop(temp_out) * (target_seasonal / base_seasonal_cop())
}

/// Defrost penalty multiplier (1.0 = no penalty, capped at 2.0).
///
/// Frost accumulates fastest just above freezing at high humidity; the
/// temperature multiplier peaks in the 36-40 °F band.
pub fn defrost_penalty(outdoor_temp: f64, humidity_pct: f64) -> f64 {
    let rh = humidity_pct / 100.0;
    let t = outdoor_temp;
    let in_peak_band = (36.0..=40.0).contains(&t);

    let temp_mult = if in_peak_band {
        1.0
    } else if t > 40.0 && t <= 45.0 {
        1.0 - ((t - 40.0) / 5.0) * 0.5
    } else if (32.0..36.0).contains(&t) {
        1.0 - ((36.0 - t) / 4.0) * 0.1
    } else if (20.0..32.0).contains(&t) {
        0.9 - ((32.0 - t) / 12.0) * 0.3
    } else if t < 20.0 {
        (0.6 - ((20.0 - t) / 30.0) * 0.4).max(0.2)
    } else if t <= 50.0 {
        0.5 - ((t - 45.0) / 5.0) * 0.4
    } else {
        0.1
    };

    let base_penalty = if in_peak_band && rh >= 0.90 {
        0.20
    } else if in_peak_band && rh >= 0.80 {
        0.18
    } else {
        0.15
    };

    let mut penalty = base_penalty * rh * temp_mult;
    if rh >= 0.95 && (32.0..=42.0).contains(&t) {
        penalty += (rh - 0.95) * 0.10 * temp_mult;
    }
    (1.0 + penalty).clamp(1.0, 2.0)
}

/// A heat pump described by its nominal size and seasonal rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPump {
    pub tons: f64,
    pub hspf2: f64,
    pub cutoff_temp_f: f64,
}

impl Default for HeatPump {
    fn default() -> Self {
        Self {
            tons: 2.0,
            hspf2: 9.0,
            cutoff_temp_f: DEFAULT_CUTOFF_F,
        }
    }
}

/// Energy used during one timestep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyEnergy {
    /// Compressor electricity
    pub hp_kwh: f64,
    /// Resistance backup electricity for the capacity deficit
    pub aux_kwh: f64,
    /// Building heat loss over the step
    pub load_btu: f64,
}

impl HourlyEnergy {
    pub fn total_kwh(&self) -> f64 {
        self.hp_kwh + self.aux_kwh
    }
}

impl HeatPump {
    /// Heating output available at an outdoor temperature, BTU/hr.
    pub fn capacity_btu_hr(&self, temp_out: f64) -> f64 {
        self.tons * BTU_PER_TON * capacity_factor(temp_out, self.cutoff_temp_f)
    }

    /// Energy needed to hold `indoor_temp` for `dt_hours` against a
    /// building whose design heat loss (at a 70 °F difference) is
    /// `design_heat_loss_btu`.
    pub fn heating_step(
        &self,
        indoor_temp: f64,
        outdoor_temp: f64,
        humidity_pct: f64,
        design_heat_loss_btu: f64,
        dt_hours: f64,
    ) -> HourlyEnergy {
        let loss_per_degree = if design_heat_loss_btu > 0.0 {
            design_heat_loss_btu / 70.0
        } else {
            0.0
        };
        let building_loss = loss_per_degree * (indoor_temp - outdoor_temp).max(0.0);
        let available = self.capacity_btu_hr(outdoor_temp);

        let effective_cop =
            (cop(outdoor_temp, self.hspf2) / defrost_penalty(outdoor_temp, humidity_pct)).max(0.5);
        let delivered = if available > 0.0 {
            building_loss.min(available)
        } else {
            0.0
        };
        let deficit = (building_loss - delivered).max(0.0);

        let hp_kwh = if delivered > 0.0 {
            delivered * dt_hours / (effective_cop * BTU_PER_KWH)
        } else {
            0.0
        };
        HourlyEnergy {
            hp_kwh,
            aux_kwh: deficit / BTU_PER_KWH * dt_hours,
            load_btu: building_loss * dt_hours,
        }
    }
}
