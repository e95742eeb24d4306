use clap::Args;
use joule_core::equipment::cop;
use joule_core::gas::compare_fuels;
use joule_core::{Config, Database, EiaClient};
use serde_json::json;

use super::{print_json, runtime, CliResult};

/// Outdoor temperature at which the heat pump COP is quoted, °F.
const RATING_TEMP_F: f64 = 47.0;

#[derive(Args)]
pub struct GasArgs {
    /// Two-letter state code (defaults to location.state)
    #[arg(long)]
    state: Option<String>,
    /// Skip the EIA lookup and use this $/therm
    #[arg(long)]
    price: Option<f64>,
    /// Store the price as the configured gas rate
    #[arg(long)]
    save: bool,
}

pub fn run(args: GasArgs) -> CliResult {
    let mut config = Config::load()?;

    let (per_therm, source) = match args.price {
        Some(p) if p > 0.0 => (p, json!("manual")),
        Some(p) => return Err(format!("price must be positive, got {p}").into()),
        None => {
            let state = args
                .state
                .clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| Some(config.location.state.clone()).filter(|s| !s.trim().is_empty()))
                .ok_or("no state given; pass --state or set location.state")?;
            let client = EiaClient::new().base_url(&config.api.eia_url);
            let price = runtime()?.block_on(client.residential_price(&state))?;
            (price.dollars_per_therm, serde_json::to_value(&price)?)
        }
    };

    if args.save {
        config.set("rates.gas_rate", &per_therm.to_string())?;
    }
    // A stored schedule replaces the flat rate, as in forecasts.
    let electricity_rate = match Database::open()?.rate_schedule()? {
        Some(schedule) => (schedule.average_rate() * 10_000.0).round() / 10_000.0,
        None => config.rates.electricity_rate,
    };
    let hp_cop = cop(RATING_TEMP_F, config.equipment.hspf2);
    let comparison = compare_fuels(
        per_therm,
        config.equipment.afue,
        electricity_rate,
        hp_cop,
    );
    print_json(&json!({
        "dollars_per_therm": per_therm,
        "source": source,
        "electricity_rate": electricity_rate,
        "heat_pump_cop": (hp_cop * 100.0).round() / 100.0,
        "comparison": comparison,
    }))
}
