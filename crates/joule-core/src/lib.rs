//! # Joule Core Library
//!
//! This library provides the calculations behind the Joule home HVAC
//! analyzer. Every operation is available through the standalone CLI
//! binary, which only loads configuration, reads files and prints what the
//! core returns.
//!
//! ## Architecture
//!
//! - **Telemetry**: thermostat CSV ingestion with vendor-agnostic column detection
//! - **Analysis**: coast-down heat-loss estimation with a runtime-balance fallback
//! - **Forecast**: hourly energy and cost projection for a month or a year
//! - **Supporting math**: rates, bills, gas prices, savings, leaderboard, rebates
//! - **Integrations**: Open-Meteo, OpenEI and EIA HTTP clients
//! - **Storage**: SQLite history and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`analyze`]: heat-loss factor and balance point from a [`TelemetryLog`]
//! - [`monthly_forecast`]: cost of one month of weather
//! - [`Database`]: analysis and savings persistence
//! - [`Config`]: household profile management

pub mod analysis;
pub mod bill;
pub mod building;
pub mod equipment;
pub mod error;
pub mod forecast;
pub mod gas;
pub mod integrations;
pub mod leaderboard;
pub mod rates;
pub mod rebates;
pub mod savings;
pub mod storage;
pub mod telemetry;
pub mod weather;

pub use analysis::{analyze, AnalysisResult, AnalysisSettings, BalancePoint, EstimateMethod};
pub use building::{BuildingProfile, HeatLossSource};
pub use equipment::{HeatPump, PrimarySystem};
pub use error::{
    AnalysisError, ApiError, ConfigError, CoreError, DatabaseError, TelemetryError, ValidationError,
};
pub use forecast::{annual_projection, monthly_forecast, ForecastSettings, MonthlyForecast};
pub use integrations::{ApiService, EiaClient, OpenEiClient, OpenMeteoClient};
pub use rates::RateSchedule;
pub use savings::{SavingsEvent, SavingsTracker};
pub use storage::{Config, Database};
pub use telemetry::{parse_thermostat_csv, TelemetryLog};
pub use weather::DailyWeather;
