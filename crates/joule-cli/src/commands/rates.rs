use std::path::PathBuf;

use clap::Subcommand;
use joule_core::rates::{parse_openei_rate, parse_rate_text, RateSchedule};
use joule_core::{Config, Database, OpenEiClient};
use serde_json::json;

use super::{print_json, read_input, runtime, CliResult};

#[derive(Subcommand)]
pub enum RatesAction {
    /// Convert "$0.13/kWh", "12.5 cents" or "0.13" to $/kWh
    ParseText {
        text: String,
        /// Store as the configured electricity rate
        #[arg(long)]
        save: bool,
    },
    /// Read a saved OpenEI utility_rates response
    ParseOpenei {
        file: PathBuf,
        /// Use this schedule for forecasts
        #[arg(long)]
        save: bool,
    },
    /// Fetch the residential schedule for the configured location
    Fetch {
        /// Use this schedule for forecasts
        #[arg(long)]
        save: bool,
    },
    /// Show the schedule used for forecasts
    Show,
    /// Go back to the flat configured rate
    Clear,
}

fn summarize(schedule: &RateSchedule) -> serde_json::Value {
    json!({
        "name": schedule.name,
        "utility": schedule.utility,
        "fixed_monthly_charge": schedule.fixed_monthly_charge,
        "periods": schedule.periods.len(),
        "average_rate": (schedule.average_rate() * 10_000.0).round() / 10_000.0,
        "schedule": schedule,
    })
}

fn store(schedule: &RateSchedule, save: bool) -> CliResult {
    if save {
        Database::open()?.set_rate_schedule(Some(schedule))?;
        eprintln!("rate schedule saved");
    }
    print_json(&summarize(schedule))
}

pub fn run(action: RatesAction) -> CliResult {
    match action {
        RatesAction::ParseText { text, save } => {
            let rate = parse_rate_text(&text)?;
            if save {
                let mut config = Config::load()?;
                config.set("rates.electricity_rate", &rate.to_string())?;
            }
            print_json(&json!({ "rate_per_kwh": rate }))
        }
        RatesAction::ParseOpenei { file, save } => {
            let schedule = parse_openei_rate(&read_input(&file)?)?;
            store(&schedule, save)
        }
        RatesAction::Fetch { save } => {
            let config = Config::load()?;
            let (lat, lon) = config
                .location
                .coordinates()
                .ok_or("no location configured; set location.latitude and location.longitude")?;
            let client = OpenEiClient::new().base_url(&config.api.openei_url);
            let schedule = runtime()?.block_on(client.fetch_residential(lat, lon))?;
            store(&schedule, save)
        }
        RatesAction::Show => match Database::open()?.rate_schedule()? {
            Some(schedule) => print_json(&summarize(&schedule)),
            None => {
                let config = Config::load()?;
                print_json(&json!({
                    "flat_rate": config.rates.electricity_rate,
                    "fixed_monthly_charge": config.rates.fixed_monthly_charge,
                }))
            }
        },
        RatesAction::Clear => {
            Database::open()?.set_rate_schedule(None)?;
            println!("rate schedule cleared");
            Ok(())
        }
    }
}
