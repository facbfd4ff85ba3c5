//! Storage seam for the engine.
//!
//! The engine never talks to a concrete database; it goes through the
//! [`EventStore`] and [`StateStore`] traits. Two backends ship: an in-memory
//! store for tests and fixtures, and a SQLite store with versioned
//! migrations.

pub mod memory;
mod migrations;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::event::{SmokeEvent, WakeEvent};
use crate::records::{DailyScoreRecord, ProgressionState, TemporaryBonus, UnlockedBadge};
use crate::settings::UserSettings;

/// Read/write access to raw smoke and wake events.
pub trait EventStore {
    /// Insert a smoke event.
    fn insert_event(&self, event: &SmokeEvent) -> Result<(), StoreError>;

    /// Delete an event by id; returns the removed event when it existed.
    fn delete_event(&self, owner: &str, event_id: &str)
        -> Result<Option<SmokeEvent>, StoreError>;

    /// All events for one day, sorted by timestamp.
    fn events_by_date(&self, owner: &str, date: NaiveDate)
        -> Result<Vec<SmokeEvent>, StoreError>;

    /// Events over an inclusive date range, grouped by day and sorted within
    /// each day.
    fn events_by_range(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, Vec<SmokeEvent>>, StoreError>;

    /// Upsert the wake entry for (owner, date).
    fn upsert_wake(&self, wake: &WakeEvent) -> Result<(), StoreError>;

    /// Wake entry for one day.
    fn wake_by_date(&self, owner: &str, date: NaiveDate)
        -> Result<Option<WakeEvent>, StoreError>;

    /// Wake entries over an inclusive date range.
    fn wake_by_range(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, WakeEvent>, StoreError>;

    /// Event count for one day.
    fn count_by_date(&self, owner: &str, date: NaiveDate) -> Result<u32, StoreError>;

    /// Day of the user's first event ever.
    fn first_event_date(&self, owner: &str) -> Result<Option<NaiveDate>, StoreError>;

    /// Lifetime event count.
    fn total_count(&self, owner: &str) -> Result<u64, StoreError>;

    /// Event count on days strictly before `before`.
    fn total_count_until(&self, owner: &str, before: NaiveDate) -> Result<u64, StoreError>;

    /// Mean daily event count over the trailing window ending yesterday
    /// relative to `today`; `None` when no day in the window has events.
    fn average_daily_count(
        &self,
        owner: &str,
        window_days: u32,
        today: NaiveDate,
    ) -> Result<Option<f64>, StoreError>;
}

/// Read/write access to derived per-user state.
pub trait StateStore {
    /// Progression singleton, when it exists.
    fn progression(&self, owner: &str) -> Result<Option<ProgressionState>, StoreError>;

    /// Write the progression singleton. Fails with [`StoreError::Conflict`]
    /// when the stored version no longer matches `state.version`; on success
    /// the stored version is `state.version + 1`.
    fn put_progression(&self, state: &ProgressionState) -> Result<(), StoreError>;

    /// Daily record for one day.
    fn daily_record(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyScoreRecord>, StoreError>;

    /// Most recent daily record, for the streak fast path.
    fn latest_daily_record(&self, owner: &str)
        -> Result<Option<DailyScoreRecord>, StoreError>;

    /// Most recent daily record strictly before `date`, for incremental
    /// streak maintenance.
    fn latest_record_before(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyScoreRecord>, StoreError>;

    /// Upsert the record for (owner, date).
    fn upsert_daily_record(&self, record: &DailyScoreRecord) -> Result<(), StoreError>;

    /// Records over an inclusive date range, ordered by date.
    fn daily_records_range(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyScoreRecord>, StoreError>;

    /// Insert a temporary bonus.
    fn insert_bonus(&self, bonus: &TemporaryBonus) -> Result<(), StoreError>;

    /// Bonuses still active at `now`. Expiry sweeping is external; this query
    /// simply filters on `expires_at`.
    fn active_bonuses(&self, owner: &str, now: DateTime<Utc>)
        -> Result<Vec<TemporaryBonus>, StoreError>;

    /// Record an unlocked badge; returns false when (owner, badge_code)
    /// already exists.
    fn insert_badge(&self, badge: &UnlockedBadge) -> Result<bool, StoreError>;

    /// Typed settings for the user; defaults when never written.
    fn settings(&self, owner: &str) -> Result<UserSettings, StoreError>;

    /// Persist the user's settings.
    fn put_settings(&self, owner: &str, settings: &UserSettings) -> Result<(), StoreError>;
}

/// Returns `~/.config/taper[-dev]/` based on TAPER_ENV.
///
/// Set TAPER_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TAPER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("taper-dev")
    } else {
        base_dir.join("taper")
    };

    std::fs::create_dir_all(&dir).map_err(|e| StoreError::DataDir(e.to_string()))?;
    Ok(dir)
}
