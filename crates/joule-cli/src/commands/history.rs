use clap::Args;
use joule_core::Database;

use super::{print_json, CliResult};

#[derive(Args)]
pub struct HistoryArgs {
    /// Maximum number of analyses to show
    #[arg(long, default_value_t = 20)]
    limit: usize,
    /// Delete the analysis with this id instead of listing
    #[arg(long)]
    delete: Option<i64>,
}

pub fn run(args: HistoryArgs) -> CliResult {
    let db = Database::open()?;
    if let Some(id) = args.delete {
        if !db.delete_analysis(id)? {
            return Err(format!("no analysis with id {id}").into());
        }
        println!("deleted analysis {id}");
        return Ok(());
    }
    print_json(&db.list_analyses(args.limit)?)
}
