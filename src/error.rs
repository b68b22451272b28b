//! Error types for the convene scheduling core.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Main error type for scheduling operations.
#[derive(Error, Debug)]
pub enum SchedulingError {
    /// The requested block conflicts with an existing request or meeting.
    #[error("slot {date} {start} is unavailable: {reason}")]
    SlotUnavailable {
        date: NaiveDate,
        start: NaiveTime,
        reason: String,
    },

    /// The referenced availability window is unknown or no longer active.
    #[error("availability window {0} is inactive or unknown")]
    WindowInactive(String),

    /// The referenced meeting request does not exist.
    #[error("meeting request not found: {0}")]
    RequestNotFound(String),

    /// The referenced meeting does not exist.
    #[error("meeting not found: {0}")]
    MeetingNotFound(String),

    /// The request was already accepted or rejected.
    #[error("request {0} has already been responded to")]
    AlreadyResponded(String),

    /// The meeting was already cancelled.
    #[error("meeting {0} is already cancelled")]
    AlreadyCancelled(String),

    /// The record is in a state that forbids the attempted transition.
    #[error("invalid state for {entity} {id}: {state}")]
    InvalidState {
        entity: &'static str,
        id: String,
        state: String,
    },

    /// The actor is not a party to the resource being acted on.
    #[error("{actor} is not authorized to act on {resource}")]
    NotAuthorized { actor: String, resource: String },

    /// Input failed validation before any state was touched.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Validation failures for malformed commands.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("required field is empty: {0}")]
    EmptyField(&'static str),

    #[error("invalid time range: {start} is not before {end}")]
    InvalidTimeRange { start: NaiveTime, end: NaiveTime },

    #[error("window is shorter than one {0}-minute block")]
    WindowTooShort(u32),

    #[error("date {0} is not in the future")]
    PastDate(NaiveDate),

    #[error("time span {start}-{end} falls outside office hours {open}-{close}")]
    OutsideOfficeHours {
        start: NaiveTime,
        end: NaiveTime,
        open: NaiveTime,
        close: NaiveTime,
    },

    #[error("weekend windows are not accepted")]
    WeekendNotAllowed,

    #[error("date {date} does not match the window ({expected})")]
    WindowDateMismatch { date: NaiveDate, expected: String },

    #[error("block {start}-{end} is not a {block_minutes}-minute block aligned to the window")]
    MisalignedBlock {
        start: NaiveTime,
        end: NaiveTime,
        block_minutes: u32,
    },

    #[error("duration must be a positive number of minutes, got {0}")]
    InvalidDuration(u32),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("user {user} does not have the {expected} role")]
    RoleMismatch { user: String, expected: String },

    #[error("proposed time is outside the shared availability of {0} and {1}")]
    OutsideSharedAvailability(String, String),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Storage-related errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate identifier: {0}")]
    DuplicateId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for scheduling operations.
pub type Result<T> = std::result::Result<T, SchedulingError>;
