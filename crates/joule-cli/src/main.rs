use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "joule-cli", version, about = "Joule home HVAC analyzer CLI")]
struct Cli {
    /// Debug logging on stderr (overrides JOULE_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate heat loss from a thermostat CSV export
    Analyze(commands::analyze::AnalyzeArgs),
    /// Stored analyses
    History(commands::history::HistoryArgs),
    /// Energy cost forecasts
    Forecast {
        #[command(subcommand)]
        action: commands::forecast::ForecastAction,
    },
    /// Simplified Manual-J design loads
    Load(commands::load::LoadArgs),
    /// Parse utility bill text and compare with a forecast
    Bill(commands::bill::BillArgs),
    /// Electricity rate schedules
    Rates {
        #[command(subcommand)]
        action: commands::rates::RatesAction,
    },
    /// Natural gas prices and fuel cost comparison
    Gas(commands::gas::GasArgs),
    /// Savings tracking
    Savings {
        #[command(subcommand)]
        action: commands::savings::SavingsAction,
    },
    /// Rank homes and compute percentiles
    Leaderboard(commands::leaderboard::LeaderboardArgs),
    /// Equipment rebate estimate
    Rebates(commands::rebates::RebatesArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// API key management for data services
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("JOULE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::History(args) => commands::history::run(args),
        Commands::Forecast { action } => commands::forecast::run(action),
        Commands::Load(args) => commands::load::run(args),
        Commands::Bill(args) => commands::bill::run(args),
        Commands::Rates { action } => commands::rates::run(action),
        Commands::Gas(args) => commands::gas::run(args),
        Commands::Savings { action } => commands::savings::run(action),
        Commands::Leaderboard(args) => commands::leaderboard::run(args),
        Commands::Rebates(args) => commands::rebates::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "joule-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
