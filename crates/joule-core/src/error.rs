//! Core error types for joule-core.
//!
//! This module defines the error hierarchy using thiserror so that
//! parsing, analysis, storage and API failures can be reported with
//! enough context for the CLI to print a useful message.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for joule-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Thermostat CSV ingestion errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Heat-loss estimation errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Third-party API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Errors raised while reading a thermostat CSV export.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    /// No line looked like a header row
    #[error("No header row found (expected columns such as Date and Time)")]
    NoHeader,

    /// Header exists but lacks a usable timestamp column
    #[error("Header has no date/time column: {0}")]
    MissingTimestamp(String),

    /// Header parsed but every data row was rejected
    #[error("No usable data rows ({skipped} rows skipped)")]
    NoRows { skipped: usize },
}

/// Errors raised by the heat-loss estimators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Not enough qualifying data for an estimate
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The fit produced a non-physical value
    #[error("Fit rejected: {0}")]
    FitRejected(String),
}

/// Third-party HTTP API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure
    #[error("{service} request failed: {source}")]
    Request {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("{service} response malformed: {message}")]
    Malformed { service: String, message: String },

    /// API key missing from the keyring
    #[error("No API key configured for {service}")]
    NotAuthenticated { service: String },

    /// Keyring access failed
    #[error("Credential store error: {0}")]
    Keyring(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Month outside 1..=12
    #[error("Invalid month: {0}")]
    InvalidMonth(u32),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<keyring::Error> for ApiError {
    fn from(err: keyring::Error) -> Self {
        ApiError::Keyring(err.to_string())
    }
}

impl ApiError {
    pub(crate) fn request(service: &str, source: reqwest::Error) -> Self {
        ApiError::Request {
            service: service.to_string(),
            source,
        }
    }

    pub(crate) fn malformed(service: &str, message: impl Into<String>) -> Self {
        ApiError::Malformed {
            service: service.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
