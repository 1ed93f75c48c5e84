//! Error types for the scheduling core.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Main error type for scheduling operations.
#[derive(Error, Debug)]
pub enum RotaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Calendar gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Input validation errors, rejected at the API boundary and never persisted.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("working window must end after it starts: {start}..{end}")]
    EmptyWindow { start: NaiveTime, end: NaiveTime },

    #[error("duration must be a positive number of minutes, got {0}")]
    NonPositiveDuration(i64),
}

/// A candidate slot overlaps an active appointment of the same provider.
///
/// This is the expected outcome of a lost booking race, not a fault: the
/// caller should offer a different slot.
#[derive(Error, Debug)]
#[error(
    "provider {provider_id} already holds an active appointment overlapping \
     {date} {time} ({duration_minutes} min)"
)]
pub struct ConflictError {
    pub provider_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
}

/// Illegal lifecycle transitions, named after the rejected action.
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("cannot accept an appointment in state {0}; only pending requests can be accepted")]
    Accept(String),

    #[error("cannot refuse an appointment in state {0}; only pending requests can be refused")]
    Refuse(String),

    #[error("cannot cancel an appointment in state {0}")]
    Cancel(String),

    #[error("payment is only accepted while an appointment is planned, not {0}")]
    Payment(String),

    #[error("cannot delete an appointment in state {0}; it still holds or requests a slot")]
    Delete(String),
}

/// Appointment store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(i64),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Calendar sync gateway errors. Always non-fatal to the state transition
/// that triggered the sync.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("calendar sync is disabled or credentials are incomplete")]
    Disabled,

    #[error("calendar API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed calendar API response: {0}")]
    Response(String),
}

/// Result type alias for scheduling operations.
pub type Result<T> = std::result::Result<T, RotaError>;
