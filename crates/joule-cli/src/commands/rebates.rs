use clap::Args;
use joule_core::rebates::{calculate_rebates, payback_years};
use serde_json::json;

use super::{print_json, CliResult};

#[derive(Args)]
pub struct RebatesArgs {
    /// Five-digit ZIP code
    #[arg(long)]
    zip: String,
    /// Equipment SKU, e.g. HP-16SEER
    #[arg(long)]
    sku: String,
    /// Expected yearly energy savings, dollars
    #[arg(long)]
    annual_savings: Option<f64>,
}

pub fn run(args: RebatesArgs) -> CliResult {
    if args.zip.trim().is_empty() {
        return Err("zip code is empty".into());
    }
    let estimate = calculate_rebates(&args.zip, &args.sku);
    let payback = args
        .annual_savings
        .and_then(|s| payback_years(estimate.net_price, s));
    print_json(&json!({
        "estimate": estimate,
        "payback_years": payback,
    }))
}
