//! Smoking and wake event models.
//!
//! Events are the only raw input to the engine. A [`SmokeEvent`] is immutable
//! once logged (it can only be deleted); a [`WakeEvent`] anchors the
//! minutes-since-wake axis every score calculation runs on, and is unique per
//! (owner, date).

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// How far into the future a logged timestamp may lie (clock-skew tolerance).
pub const FUTURE_TOLERANCE_MINUTES: i64 = 5;

/// A single logged cigarette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmokeEvent {
    /// Unique event id
    pub id: String,
    /// Owning user id
    pub owner: String,
    /// When the cigarette was smoked
    pub smoked_at: DateTime<Utc>,
    /// Whether the event was logged after the fact
    pub retroactive: bool,
}

impl SmokeEvent {
    /// Create a new event, validating the timestamp against `now`.
    pub fn new(
        owner: impl Into<String>,
        smoked_at: DateTime<Utc>,
        retroactive: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(ValidationError::InvalidOwner(owner));
        }
        validate_timestamp(smoked_at, now)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            owner,
            smoked_at,
            retroactive,
        })
    }

    /// Calendar day this event belongs to.
    pub fn date(&self) -> NaiveDate {
        self.smoked_at.date_naive()
    }

    /// Minutes since midnight of the event's own day.
    pub fn minute_of_day(&self) -> i64 {
        let t = self.smoked_at.time();
        t.hour() as i64 * 60 + t.minute() as i64
    }

    /// Minutes elapsed since the day's recorded wake time.
    ///
    /// Negative when the event precedes the wake time.
    pub fn minutes_since_wake(&self, wake: &WakeEvent) -> i64 {
        self.minute_of_day() - wake.wake_minute()
    }
}

/// Reject timestamps more than [`FUTURE_TOLERANCE_MINUTES`] ahead of `now`.
pub fn validate_timestamp(
    smoked_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if (smoked_at - now).num_minutes() > FUTURE_TOLERANCE_MINUTES {
        return Err(ValidationError::FutureTimestamp {
            timestamp: smoked_at,
            tolerance_minutes: FUTURE_TOLERANCE_MINUTES,
        });
    }
    Ok(())
}

/// The recorded wake-up time for one (owner, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeEvent {
    /// Unique id
    pub id: String,
    /// Owning user id
    pub owner: String,
    /// Calendar day
    pub date: NaiveDate,
    /// Wake-up time on that day
    pub wake_time: NaiveTime,
}

impl WakeEvent {
    /// Create a new wake entry.
    pub fn new(owner: impl Into<String>, date: NaiveDate, wake_time: NaiveTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.into(),
            date,
            wake_time,
        }
    }

    /// Wake time as minutes since midnight.
    pub fn wake_minute(&self) -> i64 {
        self.wake_time.hour() as i64 * 60 + self.wake_time.minute() as i64
    }
}
