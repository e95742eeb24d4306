use std::path::PathBuf;

use clap::Args;
use joule_core::leaderboard::efficiency_grade;
use joule_core::{analyze, parse_thermostat_csv, Config, Database};
use serde_json::json;

use super::{print_json, read_input, CliResult};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Thermostat CSV export (`-` for stdin)
    file: PathBuf,
    /// Do not record the result in history
    #[arg(long)]
    no_save: bool,
    /// Use the estimated factor for future forecasts
    #[arg(long)]
    adopt: bool,
}

pub fn run(args: AnalyzeArgs) -> CliResult {
    let mut config = Config::load()?;
    let text = read_input(&args.file)?;
    let log = parse_thermostat_csv(&text)?;
    let result = analyze(&log, &config.analysis_settings())?;

    let id = if args.no_save {
        None
    } else {
        let db = Database::open()?;
        let source = args.file.file_name().and_then(|n| n.to_str());
        Some(db.save_analysis(&result, source)?)
    };
    if args.adopt {
        config.adopt_analyzer_factor(result.heat_loss_factor);
        config.save()?;
    }

    print_json(&json!({
        "id": id,
        "parse": log.report,
        "grade": efficiency_grade(result.heat_loss_per_sqft).to_string(),
        "result": result,
        "adopted": args.adopt,
    }))
}
