//! Core error types for taper-core.
//!
//! This module defines the error hierarchy using thiserror. Missing-state
//! situations (no wake time, no prior history, no progression row) are not
//! errors anywhere in this library; they resolve to documented defaults.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Core error type for taper-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors rejected at the boundary
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Shield bank errors
    #[error("Shield error: {0}")]
    Shield(#[from] ShieldError),

    /// Maintenance scheduler errors
    #[error("Maintenance error: {0}")]
    Maintenance(#[from] MaintenanceError),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Store migration failed: {0}")]
    MigrationFailed(String),

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic version check failed on a read-modify-write
    #[error("Concurrent update conflict on {0}")]
    Conflict(String),

    /// Failed to access the data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}

/// Validation errors rejected at the boundary before reaching the engine.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Timestamp lies beyond the future tolerance window
    #[error("Timestamp {timestamp} is more than {tolerance_minutes} minutes in the future")]
    FutureTimestamp {
        timestamp: DateTime<Utc>,
        tolerance_minutes: i64,
    },

    /// Empty or otherwise unusable owner id
    #[error("Invalid owner id: {0}")]
    InvalidOwner(String),
}

/// Shield bank failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShieldError {
    /// The user has no shield to consume
    #[error("No shield available")]
    NoShieldAvailable,

    /// Monthly bonus shield was already claimed this calendar month
    #[error("Monthly shield already claimed this month")]
    AlreadyClaimedThisMonth,

    /// Total score below the monthly-shield gate
    #[error("Total score {score} is below the required {required}")]
    ScoreTooLow { score: u64, required: u64 },
}

/// Maintenance scheduler failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MaintenanceError {
    /// A maintenance day was already taken in this ISO week
    #[error("Maintenance day already used in the week of {week_start}")]
    AlreadyUsedThisWeek { week_start: NaiveDate },

    /// Deactivation requested while the flag is not set
    #[error("No active maintenance day on {date}")]
    NotActive { date: NaiveDate },
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
