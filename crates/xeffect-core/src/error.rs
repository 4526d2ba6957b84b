//! Core error types for xeffect-core.
//!
//! Each concern (inbound requests, streak state, record store, configuration)
//! has its own thiserror enum; [`CoreError`] aggregates them so the service
//! layer can propagate any of them with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for xeffect-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Inbound request decoding or validation errors
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Streak state errors
    #[error(transparent)]
    Streak(#[from] StreakError),

    /// Record store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding and validating an inbound request.
#[derive(Error, Debug)]
pub enum RequestError {
    /// Body was flagged as base64 but did not decode
    #[error("Failed to decode request body: {0}")]
    Decode(String),

    /// Body is not well-formed JSON or does not match the expected shape
    #[error("Malformed request body: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is missing or malformed
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Content-Type other than application/json
    #[error("'{0}' is not a supported Content-Type.")]
    UnsupportedMediaType(String),

    /// Action name the service does not handle
    #[error("Unknown goal action: '{0}'")]
    UnknownAction(String),
}

/// Errors about streak dates and the consistency of stored streak state.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StreakError {
    /// A supplied or stored date is not a `YYYY-MM-DD` calendar date
    #[error("Cannot parse '{value}' as a YYYY-MM-DD date")]
    DateParse { value: String },

    /// The stored map and index disagree, or intervals overlap/touch
    #[error("Corrupt streak record: {0}")]
    CorruptRecord(String),
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record under the given key
    #[error("Goal '{0}' not found")]
    NotFound(String),

    /// A record with this key already exists
    #[error("Goal '{0}' already exists")]
    AlreadyExists(String),

    /// Conditional update rejected because the record changed since it was read
    #[error("Goal '{id}' was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict { id: String, expected: u64, actual: u64 },

    /// A field operation does not fit the stored record
    #[error("Invalid field operation: {0}")]
    InvalidOperation(String),

    /// Configured table name is not a plain SQL identifier
    #[error("Invalid table name: '{0}'")]
    InvalidTable(String),

    /// Failed to open the database file
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored document could not be (de)serialized
    #[error("Stored record is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// Store mutex was poisoned by a panicking writer
    #[error("Record store is unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Data directory could not be determined or created
    #[error("Failed to prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },

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
}

impl StoreError {
    /// Whether a fresh fetch-decide-apply cycle may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
