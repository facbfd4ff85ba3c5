//! Streak tracker: consecutive strictly-positive days.
//!
//! Two paths exist and must agree on any dataset. The fast path reads the
//! counters carried on the most recent daily record; the authoritative path
//! rescans every day from the user's first event. Maintenance days are
//! skipped outright: they neither break nor extend a streak, and their
//! records carry the run forward unchanged so the fast path stays one
//! lookup.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::records::DailyScoreRecord;
use crate::store::StateStore;

/// Current and best streak for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakInfo {
    /// Consecutive positive days ending at the most recent scored day
    pub current: u32,
    /// Longest run ever
    pub best: u32,
}

/// O(1) read from the most recent daily record.
///
/// Quiet days produce no record, so a latest record older than `today`
/// means the run is already broken; only the best survives.
pub fn fast_path(latest: Option<&DailyScoreRecord>, today: NaiveDate) -> StreakInfo {
    match latest {
        Some(record) if record.date >= today => StreakInfo {
            current: record.streak,
            best: record.best_streak,
        },
        Some(record) => StreakInfo {
            current: 0,
            best: record.best_streak,
        },
        None => StreakInfo::default(),
    }
}

/// Streak counters for a day about to be upserted, derived from the
/// previous day's record.
///
/// A missing previous-day record is a break: a day that produced no record
/// produced no positive score. Maintenance days inherit the carried run.
pub fn counters_for_day<S: StateStore + ?Sized>(
    store: &S,
    owner: &str,
    day: NaiveDate,
    day_streak_positive: bool,
    day_is_maintenance: bool,
) -> Result<StreakInfo, StoreError> {
    let carried = store
        .daily_record(owner, day - Duration::days(1))?
        .map(|r| r.streak)
        .unwrap_or(0);
    let current = if day_is_maintenance {
        carried
    } else if day_streak_positive {
        carried + 1
    } else {
        0
    };
    let best_before = store
        .latest_record_before(owner, day)?
        .map(|r| r.best_streak)
        .unwrap_or(0);
    Ok(StreakInfo {
        current,
        best: best_before.max(current),
    })
}

/// Day-by-day authoritative scan.
///
/// Feed every day from the user's first event through today in order; quiet
/// days count as non-positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakScan {
    run: u32,
    best: u32,
}

impl StreakScan {
    /// Start an empty scan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one day.
    pub fn observe(&mut self, streak_positive: bool, is_maintenance: bool) {
        if is_maintenance {
            return;
        }
        if streak_positive {
            self.run += 1;
            self.best = self.best.max(self.run);
        } else {
            self.run = 0;
        }
    }

    /// Counters after the days observed so far.
    pub fn info(&self) -> StreakInfo {
        StreakInfo {
            current: self.run,
            best: self.best,
        }
    }
}
