pub mod analyze;
pub mod auth;
pub mod bill;
pub mod config;
pub mod forecast;
pub mod gas;
pub mod history;
pub mod leaderboard;
pub mod load;
pub mod rates;
pub mod rebates;
pub mod savings;

use std::io::Read;
use std::path::Path;

use serde::Serialize;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// File contents, or stdin for `-`.
pub fn read_input(path: &Path) -> CliResult<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()).into())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runtime for the async HTTP clients.
pub fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}
