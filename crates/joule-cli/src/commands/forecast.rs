use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use clap::{Args, Subcommand};
use joule_core::forecast::{compare_scenarios, Assumptions, MonthNormal, Scenario};
use joule_core::weather::{complete_month, parse_forecast_response};
use joule_core::{annual_projection, monthly_forecast, Config, Database, OpenMeteoClient};
use tracing::info;

use super::{print_json, read_input, runtime, CliResult};

#[derive(Subcommand)]
pub enum ForecastAction {
    /// Cost of one month from forecast weather
    Month {
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
        /// 1-12, defaults to the current month
        #[arg(long)]
        month: Option<u32>,
        /// Saved Open-Meteo forecast response instead of fetching
        #[arg(long)]
        weather: Option<PathBuf>,
    },
    /// Twelve-month projection from monthly climate normals
    Annual {
        /// JSON array of {month, high_f, low_f, humidity_pct}
        normals: PathBuf,
        #[command(flatten)]
        assumptions: AssumptionArgs,
    },
    /// Price upgrade or setpoint scenarios against the current setup
    Compare {
        /// JSON array of {month, high_f, low_f, humidity_pct}
        normals: PathBuf,
        /// JSON array of {name, assumptions, upgrade_cost}
        scenarios: PathBuf,
    },
}

#[derive(Args)]
pub struct AssumptionArgs {
    /// Degrees added to every normal high and low
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    temp_offset: f64,
    /// Multiplier on electricity and gas prices
    #[arg(long, default_value_t = 1.0)]
    rate_multiplier: f64,
    #[arg(long)]
    hspf2: Option<f64>,
    #[arg(long)]
    seer2: Option<f64>,
    #[arg(long)]
    tons: Option<f64>,
}

impl From<AssumptionArgs> for Assumptions {
    fn from(a: AssumptionArgs) -> Self {
        Assumptions {
            temp_offset_f: a.temp_offset,
            rate_multiplier: a.rate_multiplier,
            hspf2: a.hspf2,
            seer2: a.seer2,
            tons: a.tons,
        }
    }
}

fn load_normals(path: &Path) -> CliResult<Vec<MonthNormal>> {
    let text = read_input(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn run(action: ForecastAction) -> CliResult {
    let config = Config::load()?;
    let schedule = Database::open()?.rate_schedule()?;
    let settings = config.forecast_settings(schedule);

    match action {
        ForecastAction::Month {
            year,
            month,
            weather,
        } => {
            let today = Local::now().date_naive();
            let year = year.unwrap_or(today.year());
            let month = month.unwrap_or(today.month());

            let days = match weather {
                Some(path) => {
                    let parsed = parse_forecast_response(&read_input(&path)?)?;
                    complete_month(year, month, &parsed)?
                }
                None => {
                    let (lat, lon) = config.location.coordinates().ok_or(
                        "no location configured; set location.latitude and location.longitude or pass --weather",
                    )?;
                    let client = OpenMeteoClient::with_base_urls(
                        &config.api.open_meteo_forecast_url,
                        &config.api.open_meteo_archive_url,
                    );
                    runtime()?.block_on(client.fetch_month(lat, lon, year, month, today))?
                }
            };
            let forecast = monthly_forecast(&days, &settings, year, month)?;
            info!(total = forecast.total_monthly_cost, "forecast complete");
            print_json(&forecast)
        }
        ForecastAction::Annual {
            normals,
            assumptions,
        } => {
            let normals = load_normals(&normals)?;
            let projection = annual_projection(&normals, &settings, &assumptions.into())?;
            print_json(&projection)
        }
        ForecastAction::Compare { normals, scenarios } => {
            let normals = load_normals(&normals)?;
            let scenarios: Vec<Scenario> = serde_json::from_str(&read_input(&scenarios)?)?;
            if scenarios.is_empty() {
                return Err("scenario file has no scenarios".into());
            }
            let results =
                compare_scenarios(&normals, &settings, &Assumptions::default(), &scenarios)?;
            print_json(&results)
        }
    }
}
