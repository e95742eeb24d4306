use clap::Args;
use joule_core::building::{manual_j_estimate, LoadParams};
use joule_core::Config;

use super::{print_json, CliResult};

#[derive(Args)]
pub struct LoadArgs {
    /// IECC climate zone (1-7)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=7))]
    climate_zone: u8,
    /// Conditioned floor area (defaults to the configured home)
    #[arg(long)]
    square_feet: Option<f64>,
    #[arg(long)]
    ceiling_height: Option<f64>,
    /// Insulation multiplier, 1.0 = average
    #[arg(long)]
    insulation: Option<f64>,
}

pub fn run(args: LoadArgs) -> CliResult {
    let config = Config::load()?;
    let params = LoadParams {
        square_feet: args.square_feet.unwrap_or(config.home.square_feet),
        ceiling_height_ft: args.ceiling_height.unwrap_or(config.home.ceiling_height_ft),
        insulation_level: args.insulation.unwrap_or(config.home.insulation_level),
        climate_zone: args.climate_zone,
    };
    if params.square_feet <= 0.0 {
        return Err("square feet must be positive".into());
    }
    print_json(&manual_j_estimate(&params))
}
