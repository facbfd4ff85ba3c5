//! Interval progression engine: the monotonically loosening target spacing.
//!
//! The target interval starts at the smoothed historical spacing (floored at
//! one hour) and grows by one minute per day, plus a half-minute bonus on
//! days following a clear overshoot of the previous target. Maintenance
//! days freeze it. Outside an explicit account reset it never decreases.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::records::{DailyScoreRecord, ProgressionState};
use crate::store::StateStore;

/// Floor for the very first target interval.
pub const DEFAULT_TARGET_INTERVAL: f64 = 60.0;

/// Mandatory growth per non-maintenance day, in minutes.
pub const DAILY_INCREMENT: f64 = 1.0;

/// Extra growth after a day that beat its target by more than
/// [`OVERSHOOT_RATIO`].
pub const OVERSHOOT_BONUS: f64 = 0.5;

/// Ratio of achieved to target spacing that earns the bonus.
pub const OVERSHOOT_RATIO: f64 = 1.10;

/// The first target interval for an account:
/// `max(DEFAULT_TARGET_INTERVAL, smoothed)`.
pub fn first_target(smoothed_interval: f64) -> f64 {
    smoothed_interval.max(DEFAULT_TARGET_INTERVAL)
}

/// Bonus growth earned by yesterday's performance.
pub fn overshoot_bonus(yesterday: Option<&DailyScoreRecord>) -> f64 {
    let Some(record) = yesterday else {
        return 0.0;
    };
    match (record.avg_interval, record.target_interval) {
        (Some(avg), Some(target)) if target > 0.0 && avg / target > OVERSHOOT_RATIO => {
            OVERSHOOT_BONUS
        }
        _ => 0.0,
    }
}

/// Target for a non-maintenance day following `previous`.
pub fn next_target(previous: f64, yesterday: Option<&DailyScoreRecord>) -> f64 {
    previous + DAILY_INCREMENT + overshoot_bonus(yesterday)
}

/// Advance the persisted target interval to `day`, bumping once per elapsed
/// calendar day and freezing across days flagged as maintenance. Returns the
/// interval in force on `day`. The caller persists `state`.
pub fn advance_to<S: StateStore + ?Sized>(
    store: &S,
    state: &mut ProgressionState,
    day: NaiveDate,
    smoothed_interval: f64,
) -> Result<f64, StoreError> {
    let Some(mut target) = state.current_target_interval else {
        let target = first_target(smoothed_interval);
        state.current_target_interval = Some(target);
        state.interval_updated_on = Some(day);
        return Ok(target);
    };

    let mut cursor = state.interval_updated_on.unwrap_or(day);
    if cursor > day {
        // Historical re-score: the interval clock never moves backwards.
        return Ok(target);
    }
    while cursor < day {
        cursor += Duration::days(1);
        let frozen = store
            .daily_record(&state.owner, cursor)?
            .map(|r| r.is_maintenance_day)
            .unwrap_or(false);
        if frozen {
            continue;
        }
        let yesterday = store.daily_record(&state.owner, cursor - Duration::days(1))?;
        target = next_target(target, yesterday.as_ref()).max(target);
    }

    state.current_target_interval = Some(target);
    state.interval_updated_on = Some(day);
    Ok(target)
}

/// Reset marker: clears the interval so the next calculation starts fresh.
/// Only an explicit account reset may call this.
pub fn reset(state: &mut ProgressionState) {
    state.current_target_interval = None;
    state.interval_updated_on = None;
}

/// Serializable view of the progression constants, for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalPolicy {
    pub daily_increment: f64,
    pub overshoot_bonus: f64,
    pub overshoot_ratio: f64,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            daily_increment: DAILY_INCREMENT,
            overshoot_bonus: OVERSHOOT_BONUS,
            overshoot_ratio: OVERSHOOT_RATIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn record(d: u32, avg: Option<f64>, target: Option<f64>, maintenance: bool) -> DailyScoreRecord {
        let now = Utc.with_ymd_and_hms(2025, 3, d, 22, 0, 0).unwrap();
        let mut r = DailyScoreRecord::placeholder("u1", day(d), now);
        r.avg_interval = avg;
        r.target_interval = target;
        r.is_maintenance_day = maintenance;
        r
    }

    #[test]
    fn test_first_target_floors_at_default() {
        assert_eq!(first_target(42.0), 60.0);
        assert_eq!(first_target(75.5), 75.5);
    }

    #[test]
    fn test_overshoot_bonus_requires_ratio() {
        let strong = record(9, Some(70.0), Some(60.0), false);
        let weak = record(9, Some(64.0), Some(60.0), false);
        assert_eq!(overshoot_bonus(Some(&strong)), OVERSHOOT_BONUS);
        assert_eq!(overshoot_bonus(Some(&weak)), 0.0);
        assert_eq!(overshoot_bonus(None), 0.0);
    }

    #[test]
    fn test_advance_initializes_from_smoothed() {
        let store = MemoryStore::new();
        let mut state = ProgressionState::new("u1");
        let target = advance_to(&store, &mut state, day(10), 80.0).unwrap();
        assert_eq!(target, 80.0);
        assert_eq!(state.interval_updated_on, Some(day(10)));
    }

    #[test]
    fn test_advance_bumps_once_per_day() {
        let store = MemoryStore::new();
        let mut state = ProgressionState::new("u1");
        state.current_target_interval = Some(60.0);
        state.interval_updated_on = Some(day(10));
        let target = advance_to(&store, &mut state, day(13), 60.0).unwrap();
        assert_eq!(target, 63.0);
    }

    #[test]
    fn test_advance_frozen_on_maintenance_day() {
        let store = MemoryStore::new();
        store
            .upsert_daily_record(&record(11, None, None, true))
            .unwrap();
        let mut state = ProgressionState::new("u1");
        state.current_target_interval = Some(60.0);
        state.interval_updated_on = Some(day(10));
        // Day 11 frozen, day 12 bumps.
        let target = advance_to(&store, &mut state, day(12), 60.0).unwrap();
        assert_eq!(target, 61.0);
    }

    #[test]
    fn test_advance_applies_overshoot_bonus() {
        let store = MemoryStore::new();
        store
            .upsert_daily_record(&record(10, Some(70.0), Some(60.0), false))
            .unwrap();
        let mut state = ProgressionState::new("u1");
        state.current_target_interval = Some(60.0);
        state.interval_updated_on = Some(day(10));
        let target = advance_to(&store, &mut state, day(11), 60.0).unwrap();
        assert_eq!(target, 61.5);
    }

    #[test]
    fn test_advance_never_decreases() {
        let store = MemoryStore::new();
        let mut state = ProgressionState::new("u1");
        state.current_target_interval = Some(90.0);
        state.interval_updated_on = Some(day(10));
        let target = advance_to(&store, &mut state, day(10), 45.0).unwrap();
        assert_eq!(target, 90.0);
    }

    #[test]
    fn test_reset_clears_interval() {
        let mut state = ProgressionState::new("u1");
        state.current_target_interval = Some(90.0);
        state.interval_updated_on = Some(day(10));
        reset(&mut state);
        assert_eq!(state.current_target_interval, None);
    }
}
