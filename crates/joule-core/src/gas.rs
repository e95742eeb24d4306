//! Residential natural gas prices and fuel cost comparison.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::building::round2;
use crate::equipment::{BTU_PER_KWH, BTU_PER_THERM};
use crate::error::ApiError;

const SERVICE: &str = "eia";

/// Therms per thousand cubic feet of natural gas.
pub const THERMS_PER_MCF: f64 = 10.37;

/// Latest monthly residential gas price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasPrice {
    /// `YYYY-MM`
    pub period: String,
    pub area: Option<String>,
    pub dollars_per_mcf: f64,
    pub dollars_per_therm: f64,
}

pub fn mcf_to_therm_price(dollars_per_mcf: f64) -> f64 {
    dollars_per_mcf / THERMS_PER_MCF
}

#[derive(Debug, Deserialize)]
struct EiaEnvelope {
    response: EiaResponse,
}

#[derive(Debug, Deserialize)]
struct EiaResponse {
    #[serde(default)]
    data: Vec<EiaRow>,
}

#[derive(Debug, Deserialize)]
struct EiaRow {
    period: String,
    #[serde(default)]
    duoarea: Option<String>,
    #[serde(default)]
    value: Value,
}

/// EIA returns values either as numbers or numeric strings.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pick the most recent period with a value from an EIA v2
/// `natural-gas/pri/sum` response.
pub fn parse_eia_price_response(text: &str) -> Result<GasPrice, ApiError> {
    let envelope: EiaEnvelope =
        serde_json::from_str(text).map_err(|e| ApiError::malformed(SERVICE, e.to_string()))?;

    let (row, mcf) = envelope
        .response
        .data
        .iter()
        .filter_map(|row| numeric(&row.value).filter(|v| *v > 0.0).map(|v| (row, v)))
        .max_by(|(a, _), (b, _)| a.period.cmp(&b.period))
        .ok_or_else(|| ApiError::malformed(SERVICE, "no residential price values"))?;

    Ok(GasPrice {
        period: row.period.clone(),
        area: row.duoarea.clone(),
        dollars_per_mcf: mcf,
        dollars_per_therm: round2(mcf_to_therm_price(mcf)),
    })
}

/// Cost of delivering one million BTU of heat by each fuel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelComparison {
    pub gas_per_mmbtu: f64,
    pub heat_pump_per_mmbtu: f64,
    pub resistance_per_mmbtu: f64,
    /// Heat pump COP below which the furnace is cheaper
    pub break_even_cop: f64,
}

/// Compare a furnace at `afue` with a heat pump at `cop` and resistance heat.
pub fn compare_fuels(
    gas_per_therm: f64,
    afue: f64,
    electricity_per_kwh: f64,
    cop: f64,
) -> FuelComparison {
    let mmbtu = 1_000_000.0;
    let gas = if afue > 0.0 {
        mmbtu / (BTU_PER_THERM * afue) * gas_per_therm
    } else {
        f64::INFINITY
    };
    let resistance = mmbtu / BTU_PER_KWH * electricity_per_kwh;
    let heat_pump = if cop > 0.0 { resistance / cop } else { resistance };

    FuelComparison {
        gas_per_mmbtu: round2(gas),
        heat_pump_per_mmbtu: round2(heat_pump),
        resistance_per_mmbtu: round2(resistance),
        break_even_cop: if gas > 0.0 && gas.is_finite() {
            round2(resistance / gas)
        } else {
            0.0
        },
    }
}
