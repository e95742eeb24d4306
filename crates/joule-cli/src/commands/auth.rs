use clap::Subcommand;
use joule_core::{ApiService, EiaClient, OpenEiClient};

use super::CliResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// OpenEI utility rates: login / logout / status
    Openei {
        #[command(subcommand)]
        action: AuthOp,
    },
    /// EIA natural gas prices: login / logout / status
    Eia {
        #[command(subcommand)]
        action: AuthOp,
    },
}

#[derive(Subcommand)]
pub enum AuthOp {
    /// Store an API key in the OS keyring
    Login {
        #[arg(long)]
        key: String,
    },
    /// Remove the stored key
    Logout,
    /// Check whether a key is stored
    Status,
}

pub fn run(action: AuthAction) -> CliResult {
    match action {
        AuthAction::Openei { action: op } => handle(&mut OpenEiClient::new(), op),
        AuthAction::Eia { action: op } => handle(&mut EiaClient::new(), op),
    }
}

fn handle(service: &mut dyn ApiService, op: AuthOp) -> CliResult {
    match op {
        AuthOp::Login { key } => {
            let key = key.trim();
            if key.is_empty() {
                return Err("--key must not be empty".into());
            }
            service.set_credentials(key)?;
            println!("{} key saved", service.display_name());
        }
        AuthOp::Logout => {
            service.disconnect()?;
            println!("{} disconnected", service.display_name());
        }
        AuthOp::Status => {
            println!(
                "{}: {}",
                service.name(),
                if service.is_authenticated() {
                    "authenticated"
                } else {
                    "not authenticated"
                }
            );
        }
    }
    Ok(())
}
