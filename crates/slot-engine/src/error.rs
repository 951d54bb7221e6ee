//! Error types for slot-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A busy interval whose end does not come after its start.
    #[error("Invalid interval: start {start} is not before end {end}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid working-day policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid work item {sequence}: {reason}")]
    InvalidWorkItem { sequence: u32, reason: String },

    /// The allocator produced a placement that clashes with committed time.
    /// This indicates a bug in the engine, never bad input.
    #[error(
        "Allocation invariant violated: item {sequence} at {start}..{end} clashes with {blocker_start}..{blocker_end}"
    )]
    AllocationInvariantViolation {
        sequence: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        blocker_start: DateTime<Utc>,
        blocker_end: DateTime<Utc>,
    },

    #[error("Configuration parse error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
