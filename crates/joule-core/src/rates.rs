//! Electricity rate schedules.
//!
//! A [`RateSchedule`] mirrors the OpenEI utility-rate layout: a list of
//! periods, each with cumulative tiers, and 12×24 matrices mapping
//! (month, hour) to a period index for weekdays and weekends.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::building::round2;
use crate::error::{ApiError, ValidationError};

const SERVICE: &str = "openei";
const DAYS_PER_MONTH: f64 = 365.0 / 12.0;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?|\.\d+)").expect("number regex is valid")
});

/// Parse a free-form electricity rate into $/kWh.
///
/// Accepts `$0.125/kWh`, `12.5 cents per kWh`, `12.5¢` and bare numbers.
/// A bare number above 2 is read as cents.
pub fn parse_rate_text(text: &str) -> Result<f64, ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidValue {
        field: "rate".to_string(),
        message: format!("{message}: '{text}'"),
    };

    let lower = text.trim().to_lowercase();
    let value: f64 = NUMBER_RE
        .find(&lower)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| invalid("no number found"))?;

    let cents = lower.contains("cent") || lower.contains('¢') || lower.contains("c/kwh");
    let dollars = lower.contains('$');
    let rate = if cents || (!dollars && value > 2.0) {
        value / 100.0
    } else {
        value
    };

    if !(rate > 0.0 && rate.is_finite()) {
        return Err(invalid("rate must be positive"));
    }
    Ok(rate)
}

/// One tier of a period. `max_kwh` is the cumulative monthly upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateTier {
    pub max_kwh: Option<f64>,
    /// $/kWh including adjustments
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePeriod {
    pub tiers: Vec<RateTier>,
}

impl RatePeriod {
    fn tier_for(&self, kwh_so_far: f64) -> Option<&RateTier> {
        self.tiers
            .iter()
            .find(|t| t.max_kwh.map_or(true, |max| kwh_so_far < max))
            .or_else(|| self.tiers.last())
    }

    /// Cost of `kwh` consumed from zero through the tiers.
    fn tiered_cost(&self, kwh: f64) -> f64 {
        let mut cost = 0.0;
        let mut floor = 0.0;
        for tier in &self.tiers {
            let ceiling = tier.max_kwh.unwrap_or(f64::INFINITY);
            let used = (kwh.min(ceiling) - floor).max(0.0);
            cost += used * tier.rate;
            floor = ceiling;
            if kwh <= ceiling {
                return cost;
            }
        }
        // Usage beyond the last bounded tier bills at that tier's rate.
        if let Some(last) = self.tiers.last() {
            cost += (kwh - floor).max(0.0) * last.rate;
        }
        cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    pub name: String,
    pub utility: String,
    /// $/month
    pub fixed_monthly_charge: f64,
    pub periods: Vec<RatePeriod>,
    /// `[month][hour]` → period index
    pub weekday_schedule: Vec<Vec<usize>>,
    pub weekend_schedule: Vec<Vec<usize>>,
}

fn uniform_matrix() -> Vec<Vec<usize>> {
    vec![vec![0; 24]; 12]
}

impl RateSchedule {
    /// A single flat rate all day, every month.
    pub fn flat(rate: f64, fixed_monthly_charge: f64) -> Self {
        Self {
            name: "Flat rate".to_string(),
            utility: String::new(),
            fixed_monthly_charge,
            periods: vec![RatePeriod {
                tiers: vec![RateTier { max_kwh: None, rate }],
            }],
            weekday_schedule: uniform_matrix(),
            weekend_schedule: uniform_matrix(),
        }
    }

    fn period(&self, month: u32, hour: u32, weekend: bool) -> Option<&RatePeriod> {
        let matrix = if weekend {
            &self.weekend_schedule
        } else {
            &self.weekday_schedule
        };
        let idx = matrix
            .get(month.saturating_sub(1) as usize)
            .and_then(|row| row.get(hour as usize))
            .copied()
            .unwrap_or(0);
        self.periods.get(idx).or_else(|| self.periods.first())
    }

    /// $/kWh for the next kWh at `month` (1-12) and `hour` (0-23), given the
    /// energy already used this month.
    pub fn rate_at(&self, month: u32, hour: u32, weekend: bool, kwh_so_far: f64) -> f64 {
        self.period(month, hour, weekend)
            .and_then(|p| p.tier_for(kwh_so_far))
            .map_or(0.0, |t| t.rate)
    }

    /// Monthly bill for `kwh` including the fixed charge. Tiers come from the
    /// weekday period in effect at midnight on the first of the month.
    pub fn monthly_cost(&self, kwh: f64, month: u32) -> f64 {
        let energy = self
            .period(month, 0, false)
            .map_or(0.0, |p| p.tiered_cost(kwh.max(0.0)));
        round2(energy + self.fixed_monthly_charge)
    }

    /// First-tier rate averaged over every hour of the year, weekends
    /// weighted 2/7.
    pub fn average_rate(&self) -> f64 {
        let mut weekday = 0.0;
        let mut weekend = 0.0;
        for month in 1..=12 {
            for hour in 0..24 {
                weekday += self.rate_at(month, hour, false, 0.0);
                weekend += self.rate_at(month, hour, true, 0.0);
            }
        }
        let hours = 12.0 * 24.0;
        (weekday / hours) * 5.0 / 7.0 + (weekend / hours) * 2.0 / 7.0
    }

    /// Multiply every tier's energy rate by `factor`. The fixed charge is
    /// left alone, matching how a flat rate is scaled.
    pub fn scale_energy_rates(&mut self, factor: f64) {
        for tier in self.periods.iter_mut().flat_map(|p| p.tiers.iter_mut()) {
            tier.rate *= factor;
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenEiResponse {
    #[serde(default)]
    items: Vec<OpenEiItem>,
}

#[derive(Debug, Deserialize)]
struct OpenEiItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    utility: String,
    #[serde(default)]
    energyratestructure: Vec<Vec<OpenEiTier>>,
    #[serde(default)]
    energyweekdayschedule: Vec<Vec<usize>>,
    #[serde(default)]
    energyweekendschedule: Vec<Vec<usize>>,
    fixedchargefirstmeter: Option<f64>,
    fixedchargeunits: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenEiTier {
    rate: Option<f64>,
    adj: Option<f64>,
    max: Option<f64>,
}

fn check_matrix(
    matrix: Vec<Vec<usize>>,
    periods: usize,
    which: &str,
) -> Result<Vec<Vec<usize>>, ApiError> {
    if matrix.is_empty() {
        return Ok(uniform_matrix());
    }
    let well_formed = matrix.len() == 12
        && matrix
            .iter()
            .all(|row| row.len() == 24 && row.iter().all(|&p| p < periods));
    if !well_formed {
        return Err(ApiError::malformed(
            SERVICE,
            format!("{which} schedule must be 12×24 indices below {periods}"),
        ));
    }
    Ok(matrix)
}

/// Convert the first item of an OpenEI v3 `utility_rates` response.
pub fn parse_openei_rate(text: &str) -> Result<RateSchedule, ApiError> {
    let resp: OpenEiResponse =
        serde_json::from_str(text).map_err(|e| ApiError::malformed(SERVICE, e.to_string()))?;
    let item = resp
        .items
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::malformed(SERVICE, "no rate schedules returned"))?;

    if item.energyratestructure.is_empty() {
        return Err(ApiError::malformed(
            SERVICE,
            format!("'{}' has no energy rate structure", item.name),
        ));
    }
    let periods: Vec<RatePeriod> = item
        .energyratestructure
        .iter()
        .map(|tiers| RatePeriod {
            tiers: tiers
                .iter()
                .map(|t| RateTier {
                    max_kwh: t.max,
                    rate: t.rate.unwrap_or(0.0) + t.adj.unwrap_or(0.0),
                })
                .collect(),
        })
        .collect();

    let fixed = item.fixedchargefirstmeter.unwrap_or(0.0);
    let fixed_monthly_charge = match item.fixedchargeunits.as_deref() {
        Some("$/day") => fixed * DAYS_PER_MONTH,
        _ => fixed,
    };
    debug!(name = %item.name, periods = periods.len(), "parsed OpenEI rate");

    Ok(RateSchedule {
        weekday_schedule: check_matrix(item.energyweekdayschedule, periods.len(), "weekday")?,
        weekend_schedule: check_matrix(item.energyweekendschedule, periods.len(), "weekend")?,
        name: item.name,
        utility: item.utility,
        fixed_monthly_charge: round2(fixed_monthly_charge),
        periods,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rate_text_forms() {
        assert_eq!(parse_rate_text("$0.125/kWh").unwrap(), 0.125);
        assert_eq!(parse_rate_text("12.5 cents per kWh").unwrap(), 0.125);
        assert_eq!(parse_rate_text("12.5¢").unwrap(), 0.125);
        assert_eq!(parse_rate_text("0.14").unwrap(), 0.14);
        assert_eq!(parse_rate_text("15").unwrap(), 0.15);
        assert_eq!(parse_rate_text("$1.50").unwrap(), 1.5);
        assert!(parse_rate_text("free").is_err());
        assert!(parse_rate_text("0").is_err());
    }

    fn tiered() -> RateSchedule {
        RateSchedule {
            name: "Tiered".into(),
            utility: "Test Power".into(),
            fixed_monthly_charge: 10.0,
            periods: vec![
                RatePeriod {
                    tiers: vec![
                        RateTier { max_kwh: Some(500.0), rate: 0.10 },
                        RateTier { max_kwh: None, rate: 0.20 },
                    ],
                },
                RatePeriod {
                    tiers: vec![RateTier { max_kwh: None, rate: 0.30 }],
                },
            ],
            weekday_schedule: {
                let mut m = uniform_matrix();
                for row in &mut m {
                    for h in 16..21 {
                        row[h] = 1;
                    }
                }
                m
            },
            weekend_schedule: uniform_matrix(),
        }
    }

    #[test]
    fn tiers_and_periods() {
        let s = tiered();
        assert_eq!(s.rate_at(1, 10, false, 100.0), 0.10);
        assert_eq!(s.rate_at(1, 10, false, 600.0), 0.20);
        assert_eq!(s.rate_at(1, 17, false, 0.0), 0.30);
        assert_eq!(s.rate_at(1, 17, true, 0.0), 0.10);
        // 500 * 0.10 + 300 * 0.20 + 10
        assert_eq!(s.monthly_cost(800.0, 1), 120.0);
        assert_eq!(s.monthly_cost(0.0, 1), 10.0);
    }

    #[test]
    fn bounded_tiers_extend_last_rate() {
        let period = RatePeriod {
            tiers: vec![RateTier { max_kwh: Some(100.0), rate: 0.5 }],
        };
        assert_eq!(period.tiered_cost(150.0), 75.0);
    }

    #[test]
    fn flat_average_is_the_rate() {
        let s = RateSchedule::flat(0.13, 0.0);
        assert!((s.average_rate() - 0.13).abs() < 1e-12);
        assert_eq!(s.monthly_cost(1000.0, 7), 130.0);
    }

    #[test]
    fn openei_item_conversion() {
        let weekday: Vec<Vec<usize>> = (0..12)
            .map(|_| (0..24).map(|h| usize::from((16..21).contains(&h))).collect())
            .collect();
        let weekend = vec![vec![0usize; 24]; 12];
        let body = json!({
            "items": [{
                "name": "Residential TOU",
                "utility": "Example Electric",
                "energyratestructure": [
                    [{"rate": 0.09, "adj": 0.01, "max": 500}, {"rate": 0.12}],
                    [{"rate": 0.25, "unit": "kWh"}]
                ],
                "energyweekdayschedule": weekday,
                "energyweekendschedule": weekend,
                "fixedchargefirstmeter": 0.5,
                "fixedchargeunits": "$/day"
            }]
        })
        .to_string();

        let s = parse_openei_rate(&body).unwrap();
        assert_eq!(s.name, "Residential TOU");
        assert_eq!(s.periods.len(), 2);
        assert!((s.rate_at(3, 8, false, 0.0) - 0.10).abs() < 1e-12);
        assert_eq!(s.rate_at(3, 18, false, 0.0), 0.25);
        assert_eq!(s.rate_at(3, 18, true, 0.0), 0.09 + 0.01);
        assert_eq!(s.fixed_monthly_charge, 15.21);
    }

    #[test]
    fn openei_rejects_bad_schedules() {
        let empty = json!({"items": []}).to_string();
        assert!(matches!(parse_openei_rate(&empty), Err(ApiError::Malformed { .. })));

        let out_of_range = vec![vec![3usize; 24]; 12];
        let bad = json!({
            "items": [{
                "name": "Broken",
                "energyratestructure": [[{"rate": 0.1}]],
                "energyweekdayschedule": out_of_range
            }]
        })
        .to_string();
        assert!(matches!(parse_openei_rate(&bad), Err(ApiError::Malformed { .. })));
    }

    #[test]
    fn scaling_touches_energy_rates_only() {
        let mut s = RateSchedule::flat(0.15, 10.0);
        s.scale_energy_rates(2.0);
        assert!((s.rate_at(1, 0, false, 0.0) - 0.30).abs() < 1e-12);
        assert_eq!(s.fixed_monthly_charge, 10.0);
        assert_eq!(s.monthly_cost(100.0, 1), 40.0);
    }
}
