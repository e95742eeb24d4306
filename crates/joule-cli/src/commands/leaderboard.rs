use std::path::PathBuf;

use clap::Args;
use joule_core::leaderboard::{efficiency_grade, percentile_rank, rank, LeaderboardEntry};
use serde_json::json;

use super::{print_json, read_input, CliResult};

#[derive(Args)]
pub struct LeaderboardArgs {
    /// JSON array of {name, score}
    file: PathBuf,
    /// Rank larger scores first (default: lower heat loss per ft² is better)
    #[arg(long)]
    higher_is_better: bool,
    /// Your own score, reported as a percentile of the file's scores
    #[arg(long)]
    score: Option<f64>,
}

pub fn run(args: LeaderboardArgs) -> CliResult {
    let entries: Vec<LeaderboardEntry> = serde_json::from_str(&read_input(&args.file)?)?;
    let ranked = rank(&entries, args.higher_is_better);

    let mine = args.score.map(|score| {
        let population: Vec<f64> = ranked.iter().map(|r| r.score).collect();
        json!({
            "score": score,
            "percentile": percentile_rank(score, &population, args.higher_is_better),
            "grade": (!args.higher_is_better).then(|| efficiency_grade(score).to_string()),
        })
    });
    print_json(&json!({
        "ranking": ranked,
        "you": mine,
    }))
}
