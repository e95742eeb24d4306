//! Equipment rebate estimates.
//!
//! A coarse lookup: list price by SKU, a federal incentive by equipment
//! class, a regional rebate keyed on the first zip digit and a utility bonus
//! for high-efficiency ratings encoded in the SKU.

use serde::{Deserialize, Serialize};

use crate::building::round2;

/// List price used for SKUs missing from the table.
pub const DEFAULT_BASE_PRICE: f64 = 5000.0;

const PRICES: [(&str, f64); 7] = [
    ("HP-3T-18SEER", 8500.0),
    ("HP-4T-20SEER", 12_000.0),
    ("HP-5T-18SEER", 15_000.0),
    ("AC-3T-16SEER", 4500.0),
    ("AC-4T-18SEER", 6500.0),
    ("FURNACE-80K-96AFUE", 3500.0),
    ("FURNACE-100K-98AFUE", 4500.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentClass {
    HeatPump,
    AirConditioner,
    Furnace,
    Other,
}

impl EquipmentClass {
    /// Classify by SKU prefix (`HP-`, `AC-`, `FURNACE-`).
    pub fn from_sku(sku: &str) -> Self {
        let sku = sku.to_ascii_uppercase();
        if sku.starts_with("HP") {
            EquipmentClass::HeatPump
        } else if sku.starts_with("AC") {
            EquipmentClass::AirConditioner
        } else if sku.starts_with("FURNACE") {
            EquipmentClass::Furnace
        } else {
            EquipmentClass::Other
        }
    }

    fn federal_rebate(self) -> f64 {
        match self {
            EquipmentClass::HeatPump => 2000.0,
            EquipmentClass::AirConditioner => 600.0,
            EquipmentClass::Furnace => 1500.0,
            EquipmentClass::Other => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateEstimate {
    pub zip_code: String,
    pub equipment_sku: String,
    pub equipment_class: EquipmentClass,
    pub base_price: f64,
    pub federal_rebate: f64,
    pub state_rebate: f64,
    pub utility_rebate: f64,
    pub total_rebates: f64,
    pub net_price: f64,
    pub savings_percentage: f64,
}

pub fn base_price(sku: &str) -> f64 {
    let sku = sku.to_ascii_uppercase();
    PRICES
        .iter()
        .find(|(s, _)| *s == sku)
        .map(|(_, p)| *p)
        .unwrap_or(DEFAULT_BASE_PRICE)
}

/// Regional rebate by the first digit of the zip code (5 when unknown).
pub fn state_rebate(zip_code: &str) -> f64 {
    let region = zip_code
        .trim()
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .unwrap_or(5);
    match region {
        0 | 6 => 500.0,
        2 | 5 => 400.0,
        1 | 4 | 8 => 300.0,
        9 => 250.0,
        _ => 200.0,
    }
}

/// Utility bonus for efficiency markers in the SKU.
pub fn utility_rebate(sku: &str) -> f64 {
    let sku = sku.to_ascii_uppercase();
    let mut rebate = if sku.contains("18SEER") || sku.contains("20SEER") {
        500.0
    } else if sku.contains("16SEER") {
        200.0
    } else {
        0.0
    };
    if sku.contains("96AFUE") || sku.contains("98AFUE") {
        rebate += 300.0;
    }
    rebate
}

/// Total incentives and net price for one piece of equipment.
pub fn calculate_rebates(zip_code: &str, sku: &str) -> RebateEstimate {
    let class = EquipmentClass::from_sku(sku);
    let base = base_price(sku);
    let federal = class.federal_rebate();
    let state = state_rebate(zip_code);
    let utility = utility_rebate(sku);
    let total = federal + state + utility;

    RebateEstimate {
        zip_code: zip_code.trim().to_string(),
        equipment_sku: sku.to_string(),
        equipment_class: class,
        base_price: base,
        federal_rebate: federal,
        state_rebate: state,
        utility_rebate: utility,
        total_rebates: total,
        net_price: (base - total).max(0.0),
        savings_percentage: if base > 0.0 {
            (total / base * 1000.0).round() / 10.0
        } else {
            0.0
        },
    }
}

/// Years until the net price is repaid by `annual_savings`.
pub fn payback_years(net_price: f64, annual_savings: f64) -> Option<f64> {
    (annual_savings > 0.0).then(|| round2(net_price.max(0.0) / annual_savings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_pump_in_northeast() {
        let est = calculate_rebates("02139", "HP-3T-18SEER");
        assert_eq!(est.equipment_class, EquipmentClass::HeatPump);
        assert_eq!(est.base_price, 8500.0);
        assert_eq!(est.federal_rebate, 2000.0);
        assert_eq!(est.state_rebate, 500.0);
        assert_eq!(est.utility_rebate, 500.0);
        assert_eq!(est.total_rebates, 3000.0);
        assert_eq!(est.net_price, 5500.0);
        assert_eq!(est.savings_percentage, 35.3);
    }

    #[test]
    fn furnace_gets_furnace_incentive() {
        let est = calculate_rebates("60601", "furnace-80k-96afue");
        assert_eq!(est.equipment_class, EquipmentClass::Furnace);
        assert_eq!(est.federal_rebate, 1500.0);
        assert_eq!(est.state_rebate, 500.0);
        assert_eq!(est.utility_rebate, 300.0);
        assert_eq!(est.net_price, 1200.0);
    }

    #[test]
    fn unknown_sku_and_zip_use_defaults() {
        let est = calculate_rebates("", "MINI-SPLIT");
        assert_eq!(est.base_price, DEFAULT_BASE_PRICE);
        assert_eq!(est.federal_rebate, 0.0);
        assert_eq!(est.state_rebate, 400.0);
        assert_eq!(est.net_price, 4600.0);
    }

    #[test]
    fn payback_needs_positive_savings() {
        assert_eq!(payback_years(5500.0, 1100.0), Some(5.0));
        assert_eq!(payback_years(5500.0, 0.0), None);
    }
}
