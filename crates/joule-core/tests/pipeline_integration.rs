//! Integration tests for the CSV → analysis → forecast workflow.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use joule_core::analysis::Confidence;
use joule_core::forecast::WEEKS_PER_MONTH;
use joule_core::weather::complete_month;
use joule_core::{
    analyze, monthly_forecast, parse_thermostat_csv, Config, Database, EstimateMethod,
    HeatLossSource,
};

const HEADER: &str = "Date,Time,Current Temp (F),Outdoor Temp (F),Heat Stage 1 (sec),Aux Heat 1 (sec),Cool Stage 1 (sec)";

fn line(ts: NaiveDateTime, indoor: f64, outdoor: f64, heat_s: u32) -> String {
    format!(
        "{},{},{indoor:.2},{outdoor:.1},{heat_s},0,0",
        ts.format("%Y-%m-%d"),
        ts.format("%H:%M:%S")
    )
}

/// Six days of 5-minute rows: the system is off from midnight to 03:00 and
/// the house coasts toward the outdoor temperature at `k` per hour; the rest
/// of the day the heat pump holds 70 °F.
fn synthetic_export(k: f64) -> String {
    let outdoor = 25.0;
    let mut lines = vec!["Thermostat,Living Room".to_string(), String::new(), HEADER.to_string()];
    for day in 10..16 {
        let midnight = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        for i in 0..288 {
            let ts = midnight + Duration::minutes(5 * i);
            if i <= 36 {
                let h = i as f64 / 12.0;
                let t = outdoor + (70.0 - outdoor) * (-k * h).exp();
                lines.push(line(ts, t, outdoor, 0));
            } else {
                lines.push(line(ts, 70.0, outdoor, 240));
            }
        }
    }
    lines.join("\n")
}

#[test]
fn test_csv_to_heat_loss() {
    let log = parse_thermostat_csv(&synthetic_export(0.03)).unwrap();
    assert_eq!(log.rows.len(), 6 * 288);
    assert_eq!(log.report.skipped_rows, 0);

    let mut cfg = Config::default();
    cfg.home.square_feet = 1500.0;
    let result = analyze(&log, &cfg.analysis_settings()).unwrap();

    // 1500 ft² × 8 BTU/°F/ft² × 0.03/hr
    assert_eq!(result.method, EstimateMethod::CoastDown);
    assert!(
        (result.heat_loss_factor - 360.0).abs() < 30.0,
        "factor {}",
        result.heat_loss_factor
    );
    let coast = result.coast_down.as_ref().unwrap();
    assert_eq!(coast.segments.len(), 6);
    assert_eq!(coast.confidence, Confidence::High);
    assert_eq!(result.days, 6);
    assert!(result.balance_point.temp_f.is_some());
}

#[test]
fn test_analysis_feeds_forecast_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("joule.db")).unwrap();

    let log = parse_thermostat_csv(&synthetic_export(0.03)).unwrap();
    let mut cfg = Config::default();
    let result = analyze(&log, &cfg.analysis_settings()).unwrap();
    let id = db.save_analysis(&result, Some("synthetic.csv")).unwrap();
    assert_eq!(db.latest_analysis().unwrap().unwrap().id, id);

    cfg.adopt_analyzer_factor(result.heat_loss_factor);
    let settings = cfg.forecast_settings(None);
    let (design, source) = settings.design_heat_loss();
    assert_eq!(source, HeatLossSource::Analyzer);
    assert!((design - result.heat_loss_factor * 70.0).abs() < 1e-6);

    let days = complete_month(2024, 1, &[]).unwrap();
    let forecast = monthly_forecast(&days, &settings, 2024, 1).unwrap();
    assert_eq!(forecast.days, 31);
    assert_eq!(forecast.heat_loss_source, HeatLossSource::Analyzer);
    assert!(forecast.hp_energy_kwh > 0.0);
    assert!(forecast.total_monthly_cost > forecast.baseload_cost);
    assert!((forecast.weekly_cost - forecast.total_monthly_cost / WEEKS_PER_MONTH).abs() < 0.01);
}

#[test]
fn test_tighter_house_costs_less() {
    let days = complete_month(2024, 1, &[]).unwrap();
    let mut cfg = Config::default();

    cfg.adopt_analyzer_factor(450.0);
    let leaky = monthly_forecast(&days, &cfg.forecast_settings(None), 2024, 1).unwrap();
    cfg.adopt_analyzer_factor(250.0);
    let tight = monthly_forecast(&days, &cfg.forecast_settings(None), 2024, 1).unwrap();

    assert!(tight.total_energy_kwh < leaky.total_energy_kwh);
    assert!(tight.hvac_cost < leaky.hvac_cost);
    assert_eq!(tight.baseload_cost, leaky.baseload_cost);
}
