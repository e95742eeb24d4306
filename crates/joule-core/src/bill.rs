//! Heuristic extraction of usage and cost from pasted utility-bill text.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::building::round2;
use crate::error::ValidationError;
use crate::telemetry::parse_date;

static TOTAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:total\s+(?:amount\s+)?due|amount\s+due|total\s+charges|balance\s+due|total\s+bill)[^\d$\n]{0,30}\$?\s*([\d,]*\d(?:\.\d{2})?)(?:[^\d/,]|$)",
    )
    .expect("valid total regex")
});
static KWH_LABELED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:usage|used|consumption|energy\s+use)[^\d\n]{0,30}([\d,]+(?:\.\d+)?)\s*kwh")
        .expect("valid labeled kwh regex")
});
static KWH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s*kwh\b").expect("valid kwh regex"));
static THERMS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s*therms?\b").expect("valid therms regex"));
static NUMERIC_PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}/\d{1,2}/\d{2,4})\s*(?:-|–|to|through|thru)\s*(\d{1,2}/\d{1,2}/\d{2,4})")
        .expect("valid numeric period regex")
});
static NAMED_PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    let date = r"((?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4})";
    Regex::new(&format!(r"(?i){date}\s*(?:-|–|to|through|thru)\s*{date}"))
        .expect("valid named period regex")
});
static DAYS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:(\d{1,3})\s*(?:billing\s+|service\s+)?days\b|days\s+(?:in\s+)?(?:billing\s+)?(?:period|cycle)?\s*[:=]\s*(\d{1,3}))")
        .expect("valid days regex")
});

/// Whatever could be recognised in a bill. Missing pieces are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedBill {
    pub total_due: Option<f64>,
    pub kwh_used: Option<f64>,
    pub therms_used: Option<f64>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub stated_days: Option<u32>,
}

impl ParsedBill {
    /// Billing days: the stated count, else the period length.
    pub fn days(&self) -> Option<u32> {
        self.stated_days.or_else(|| match (self.period_start, self.period_end) {
            (Some(start), Some(end)) if end > start => Some((end - start).num_days() as u32),
            _ => None,
        })
    }

    /// All-in $/kWh.
    pub fn effective_rate(&self) -> Option<f64> {
        match (self.total_due, self.kwh_used) {
            (Some(total), Some(kwh)) if kwh > 0.0 => Some((total / kwh * 10_000.0).round() / 10_000.0),
            _ => None,
        }
    }

    pub fn kwh_per_day(&self) -> Option<f64> {
        let days = self.days().filter(|d| *d > 0)?;
        Some(round2(self.kwh_used? / days as f64))
    }

    pub fn is_empty(&self) -> bool {
        *self == ParsedBill::default()
    }
}

/// `1,243.50` style amounts.
fn amount(s: &str) -> Option<f64> {
    s.replace(',', "").parse().ok()
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| amount(m.as_str()))
}

fn parse_named_date(s: &str) -> Option<NaiveDate> {
    let cleaned = s.replace(|c: char| c == '.' || c == ',', " ");
    let mut parts = cleaned.split_whitespace();
    let month = parts.next()?.get(..3)?;
    let day = parts.next()?;
    let year = parts.next()?;
    NaiveDate::parse_from_str(&format!("{month} {day} {year}"), "%b %d %Y").ok()
}

fn parse_period(text: &str) -> Option<(NaiveDate, NaiveDate)> {
    if let Some(c) = NUMERIC_PERIOD_RE.captures(text) {
        if let (Some(a), Some(b)) = (parse_date(&c[1]), parse_date(&c[2])) {
            return Some((a, b));
        }
    }
    let c = NAMED_PERIOD_RE.captures(text)?;
    Some((parse_named_date(&c[1])?, parse_named_date(&c[2])?))
}

/// Extract total, usage, billing period and day count from bill text.
pub fn parse_bill_text(text: &str) -> ParsedBill {
    let kwh_used = capture_number(&KWH_LABELED_RE, text).or_else(|| {
        KWH_RE
            .captures_iter(text)
            .filter_map(|c| amount(&c[1]))
            .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))))
    });
    let stated_days = DAYS_RE.captures(text).and_then(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .and_then(|m| m.as_str().parse().ok())
    });
    let (period_start, period_end) = match parse_period(text) {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };

    ParsedBill {
        total_due: capture_number(&TOTAL_RE, text),
        kwh_used,
        therms_used: capture_number(&THERMS_RE, text),
        period_start,
        period_end,
        stated_days,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillVerdict {
    OnTrack,
    HigherThanForecast,
    LowerThanForecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BillComparison {
    pub actual: f64,
    pub forecast: f64,
    pub difference: f64,
    pub difference_pct: f64,
    pub verdict: BillVerdict,
}

/// Band around the forecast treated as on track, percent.
pub const ON_TRACK_BAND_PCT: f64 = 10.0;

/// Compare the bill total with a forecast monthly cost.
pub fn compare_to_forecast(
    bill: &ParsedBill,
    forecast_cost: f64,
) -> Result<BillComparison, ValidationError> {
    let actual = bill.total_due.ok_or_else(|| ValidationError::InvalidValue {
        field: "total_due".to_string(),
        message: "bill text has no recognisable total".to_string(),
    })?;
    if forecast_cost <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "forecast_cost".to_string(),
            message: format!("must be positive, got {forecast_cost}"),
        });
    }

    let difference = actual - forecast_cost;
    let pct = difference / forecast_cost * 100.0;
    let verdict = if pct.abs() <= ON_TRACK_BAND_PCT {
        BillVerdict::OnTrack
    } else if pct > 0.0 {
        BillVerdict::HigherThanForecast
    } else {
        BillVerdict::LowerThanForecast
    };

    Ok(BillComparison {
        actual,
        forecast: forecast_cost,
        difference: round2(difference),
        difference_pct: (pct * 10.0).round() / 10.0,
        verdict,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {"
        ACME ELECTRIC COOPERATIVE
        Service period: 01/05/2024 - 02/04/2024 (30 days)
        Energy charge  first 500 kWh @ $0.11
        Total usage this period: 1,243 kWh
        Total Amount Due: $162.48
    "};

    #[test]
    fn parses_numeric_bill() {
        let bill = parse_bill_text(SAMPLE);
        assert_eq!(bill.total_due, Some(162.48));
        assert_eq!(bill.kwh_used, Some(1243.0));
        assert_eq!(bill.therms_used, None);
        assert_eq!(bill.period_start, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(bill.period_end, NaiveDate::from_ymd_opt(2024, 2, 4));
        assert_eq!(bill.stated_days, Some(30));
        assert_eq!(bill.days(), Some(30));
        assert_eq!(bill.effective_rate(), Some(0.1307));
        assert_eq!(bill.kwh_per_day(), Some(41.43));
    }

    #[test]
    fn parses_month_name_period_and_gas() {
        let text = indoc! {"
            Billing Period: Dec. 3, 2023 through Jan 4, 2024
            Gas used 87 therms
            Amount due $143.10
        "};
        let bill = parse_bill_text(text);
        assert_eq!(bill.period_start, NaiveDate::from_ymd_opt(2023, 12, 3));
        assert_eq!(bill.period_end, NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(bill.stated_days, None);
        assert_eq!(bill.days(), Some(32));
        assert_eq!(bill.therms_used, Some(87.0));
        assert_eq!(bill.total_due, Some(143.10));
        assert_eq!(bill.kwh_used, None);
    }

    #[test]
    fn unlabeled_kwh_takes_largest() {
        let bill = parse_bill_text("Tier 1: 500 kWh\nTier 2: 312 kWh\nMeter read 812 kWh");
        assert_eq!(bill.kwh_used, Some(812.0));
    }

    #[test]
    fn two_digit_year_period() {
        let bill = parse_bill_text("Service 12/03/23 - 01/04/24\nAmount due $98.20");
        assert_eq!(bill.period_start, NaiveDate::from_ymd_opt(2023, 12, 3));
        assert_eq!(bill.period_end, NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(bill.days(), Some(32));
    }

    #[test]
    fn whole_dollar_total() {
        assert_eq!(parse_bill_text("Amount due $143").total_due, Some(143.0));
        assert_eq!(parse_bill_text("Total due: $1,020.").total_due, Some(1020.0));
    }

    #[test]
    fn nothing_recognised() {
        assert!(parse_bill_text("hello world").is_empty());
    }

    #[test]
    fn verdict_bands() {
        let bill = ParsedBill {
            total_due: Some(105.0),
            ..ParsedBill::default()
        };
        let cmp = compare_to_forecast(&bill, 100.0).unwrap();
        assert_eq!(cmp.verdict, BillVerdict::OnTrack);
        assert_eq!(cmp.difference_pct, 5.0);

        let high = ParsedBill {
            total_due: Some(130.0),
            ..ParsedBill::default()
        };
        assert_eq!(
            compare_to_forecast(&high, 100.0).unwrap().verdict,
            BillVerdict::HigherThanForecast
        );
        let low = ParsedBill {
            total_due: Some(80.0),
            ..ParsedBill::default()
        };
        assert_eq!(
            compare_to_forecast(&low, 100.0).unwrap().verdict,
            BillVerdict::LowerThanForecast
        );

        assert!(compare_to_forecast(&ParsedBill::default(), 100.0).is_err());
        assert!(compare_to_forecast(&bill, 0.0).is_err());
    }
}
