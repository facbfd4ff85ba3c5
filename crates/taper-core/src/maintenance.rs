//! Maintenance scheduler: the weekly target-interval freeze.
//!
//! At most one activation per ISO calendar week (Monday through Sunday) per
//! user. Activation flags the day's record, creating a zero-score
//! placeholder when the day has none yet.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::error::{CoreError, MaintenanceError, StoreError};
use crate::records::DailyScoreRecord;
use crate::store::StateStore;

/// Monday and Sunday of the ISO week containing `date`.
pub fn iso_week_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let since_monday = date.weekday().num_days_from_monday() as i64;
    let monday = date - Duration::days(since_monday);
    (monday, monday + Duration::days(6))
}

/// The flagged day in `date`'s ISO week, if any.
pub fn flagged_day_in_week<S: StateStore + ?Sized>(
    store: &S,
    owner: &str,
    date: NaiveDate,
) -> Result<Option<NaiveDate>, StoreError> {
    let (monday, sunday) = iso_week_range(date);
    Ok(store
        .daily_records_range(owner, monday, sunday)?
        .into_iter()
        .find(|r| r.is_maintenance_day)
        .map(|r| r.date))
}

/// Whether an activation is still available in `date`'s week.
pub fn is_available<S: StateStore + ?Sized>(
    store: &S,
    owner: &str,
    date: NaiveDate,
) -> Result<bool, StoreError> {
    Ok(flagged_day_in_week(store, owner, date)?.is_none())
}

/// Activate a maintenance day on `date`.
///
/// Fails when the week already holds one. Returns the flagged record; the
/// caller persists it together with any streak counter updates.
pub fn activate<S: StateStore + ?Sized>(
    store: &S,
    owner: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<DailyScoreRecord, CoreError> {
    if flagged_day_in_week(store, owner, date)?.is_some() {
        let (monday, _) = iso_week_range(date);
        return Err(MaintenanceError::AlreadyUsedThisWeek { week_start: monday }.into());
    }

    let mut record = store
        .daily_record(owner, date)?
        .unwrap_or_else(|| DailyScoreRecord::placeholder(owner, date, now));
    record.is_maintenance_day = true;
    record.computed_at = now;
    Ok(record)
}

/// Deactivate the maintenance flag on `date`.
///
/// Only permitted while the flag is set on that day's record.
pub fn deactivate<S: StateStore + ?Sized>(
    store: &S,
    owner: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<DailyScoreRecord, CoreError> {
    match store.daily_record(owner, date)? {
        Some(mut record) if record.is_maintenance_day => {
            record.is_maintenance_day = false;
            record.computed_at = now;
            Ok(record)
        }
        _ => Err(MaintenanceError::NotActive { date }.into()),
    }
}
