use std::path::PathBuf;

use clap::Args;
use joule_core::bill::{compare_to_forecast, parse_bill_text};
use serde_json::json;

use super::{print_json, read_input, CliResult};

#[derive(Args)]
pub struct BillArgs {
    /// Bill text copied from a PDF or web page (`-` for stdin)
    file: PathBuf,
    /// Forecast monthly cost to compare against
    #[arg(long)]
    forecast_cost: Option<f64>,
}

pub fn run(args: BillArgs) -> CliResult {
    let bill = parse_bill_text(&read_input(&args.file)?);
    if bill.is_empty() {
        return Err("nothing recognisable in the bill text".into());
    }
    let comparison = match args.forecast_cost {
        Some(cost) => Some(compare_to_forecast(&bill, cost)?),
        None => None,
    };
    print_json(&json!({
        "bill": bill,
        "days": bill.days(),
        "effective_rate": bill.effective_rate(),
        "kwh_per_day": bill.kwh_per_day(),
        "comparison": comparison,
    }))
}
