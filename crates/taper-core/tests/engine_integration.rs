//! End-to-end tests for the scoring and progression engine over the
//! in-memory store.

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use taper_core::records::ProgressionState;
use taper_core::store::{MemoryStore, StateStore};
use taper_core::{CoreError, Engine, MaintenanceError, ShieldError};

const OWNER: &str = "u1";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn at(d: u32, h: u32, min: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, h, min, 0).unwrap()
}

fn wake(h: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, min, 0).unwrap()
}

fn engine() -> Engine<MemoryStore> {
    Engine::new(MemoryStore::new())
}

/// Seed 2025-03-10 (a Monday): wake 07:00, events at 08:00, 09:00, 10:00.
/// Gives the following day a 60-minute smoothed interval and a 60-minute
/// smoothed first offset.
fn seed_baseline_day(engine: &Engine<MemoryStore>) {
    engine
        .record_wake(OWNER, day(10), wake(7, 0), at(10, 7, 0))
        .unwrap();
    for h in [8, 9, 10] {
        engine.log_event(OWNER, at(10, h, 0), false, at(10, h, 0)).unwrap();
    }
}

#[test]
fn test_first_ever_day_is_cold_start() {
    let engine = engine();
    let outcome = engine
        .log_event(OWNER, at(10, 8, 0), false, at(10, 8, 0))
        .unwrap();
    assert_eq!(outcome.day_score, 0, "cold start day must score zero");
    assert_eq!(outcome.event_points, 0);
    assert_eq!(outcome.today_count, 1);
    assert_eq!(outcome.streak.current, 0);
    assert!(outcome.rank_transition.is_none());
}

#[test]
fn test_on_target_event_scores_zero_and_late_event_scores_deviation() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();

    // First event of the day, exactly on the smoothed first offset.
    let outcome = engine
        .log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0))
        .unwrap();
    assert_eq!(outcome.event_points, 0);
    assert_eq!(outcome.day_score, 0);

    // Second event 30 minutes past its target of 120 minutes since wake:
    // diff +30, late zone 1.0, 30 points.
    let outcome = engine
        .log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30))
        .unwrap();
    assert_eq!(outcome.event_points, 30);
    assert_eq!(outcome.day_score, 30);
    assert_eq!(outcome.streak.current, 1, "positive day extends the streak");
}

#[test]
fn test_early_event_penalized_with_zone_multiplier() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();

    // Target 120 minutes since wake, actual 100: diff -20, early zone 1.5,
    // -30 points.
    let outcome = engine
        .log_event(OWNER, at(11, 8, 40), false, at(11, 8, 40))
        .unwrap();
    assert_eq!(outcome.event_points, -30);
    assert_eq!(outcome.day_score, -30);
    assert_eq!(outcome.streak.current, 0, "negative day breaks the streak");
}

#[test]
fn test_retroactive_event_rescores_following_day() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    engine.log_event(OWNER, at(11, 9, 0), false, at(11, 9, 0)).unwrap();
    let before = engine.store().daily_record(OWNER, day(11)).unwrap().unwrap();
    assert_eq!(before.score, 0, "both events on target before the edit");

    // A retroactive event on the 10th shrinks that day's average interval
    // to 50 minutes, moving the 11th's second target from 120 to 110.
    engine
        .log_event(OWNER, at(10, 10, 30), true, at(11, 12, 0))
        .unwrap();
    let after = engine.store().daily_record(OWNER, day(11)).unwrap().unwrap();
    assert_eq!(after.score, 10, "second event is now 10 minutes late");
}

#[test]
fn test_delete_event_rescores_day() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    let late = engine
        .log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30))
        .unwrap();
    assert_eq!(late.day_score, 30);

    let deleted = engine
        .delete_event(OWNER, &late.event_id, at(11, 10, 0))
        .unwrap();
    assert_eq!(deleted.today_count, 1);
    let record = engine.store().daily_record(OWNER, day(11)).unwrap().unwrap();
    assert_eq!(record.score, 0);
    assert_eq!(record.event_count, 1);
}

#[test]
fn test_delete_unknown_event_is_not_found() {
    let engine = engine();
    let err = engine.delete_event(OWNER, "nope", at(10, 8, 0)).unwrap_err();
    assert!(matches!(err, CoreError::Store(_)));
}

#[test]
fn test_shield_zeroes_negative_subtotal_and_preserves_streak() {
    let engine = engine();
    seed_baseline_day(&engine);
    let mut state = engine.store().progression(OWNER).unwrap().unwrap();
    state.shields_count = 1;
    engine.store().put_progression(&state).unwrap();

    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    // Target 120 since wake, actual 90: diff -30, early zone 2.0, -60.
    let outcome = engine
        .log_event(OWNER, at(11, 8, 30), false, at(11, 8, 30))
        .unwrap();
    assert_eq!(outcome.day_score, -60);

    let receipt = engine.use_shield(OWNER, at(11, 9, 0)).unwrap();
    assert_eq!(receipt.points_recovered, 60);
    assert_eq!(receipt.shields_remaining, 0);

    let record = engine.store().daily_record(OWNER, day(11)).unwrap().unwrap();
    assert!(record.shield_applied);
    assert_eq!(record.score, 0);
    assert_eq!(record.streak, 1, "shielded day counts as streak-continuing");

    // No second shield available.
    let err = engine.use_shield(OWNER, at(11, 10, 0)).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Shield(ShieldError::NoShieldAvailable)
    ));
}

#[test]
fn test_maintenance_day_freezes_streak_once_per_week() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    engine.log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30)).unwrap();

    // Wednesday the 12th becomes a maintenance day; the Tuesday streak of 1
    // is carried, not extended.
    let record = engine
        .activate_maintenance_day(OWNER, day(12), at(12, 9, 0))
        .unwrap();
    assert!(record.is_maintenance_day);
    assert_eq!(record.streak, 1);

    // Second activation in the same ISO week is rejected.
    let err = engine
        .activate_maintenance_day(OWNER, day(13), at(13, 9, 0))
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Maintenance(MaintenanceError::AlreadyUsedThisWeek { .. })
    ));
    assert!(!engine.maintenance_available(OWNER, day(14)).unwrap());
    // The following Monday opens a fresh week.
    assert!(engine.maintenance_available(OWNER, day(17)).unwrap());
}

#[test]
fn test_deactivate_maintenance_rescores_day() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .activate_maintenance_day(OWNER, day(11), at(11, 9, 0))
        .unwrap();
    let record = engine
        .deactivate_maintenance_day(OWNER, day(11), at(11, 10, 0))
        .unwrap();
    assert!(!record.is_maintenance_day);
    assert!(engine.maintenance_available(OWNER, day(11)).unwrap());
}

#[test]
fn test_rank_transition_fires_on_threshold_crossing() {
    let engine = engine();
    seed_baseline_day(&engine);
    let mut state = engine.store().progression(OWNER).unwrap().unwrap();
    state.total_score = 990;
    engine.store().put_progression(&state).unwrap();

    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    // diff +30 pushes the total past 1000.
    let outcome = engine
        .log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30))
        .unwrap();
    let transition = outcome.rank_transition.expect("threshold crossed");
    assert_eq!(transition.to, "Spark");
    assert_eq!(transition.unlocked_advantages, vec!["weekly_recap"]);

    let summary = engine.progression_summary(OWNER, at(11, 12, 0)).unwrap();
    assert_eq!(summary.rank, "Spark");
    assert_eq!(summary.total_score, 1020);
}

#[test]
fn test_fast_path_streak_agrees_with_authoritative_scan() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    engine.log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30)).unwrap();
    engine
        .activate_maintenance_day(OWNER, day(12), at(12, 9, 0))
        .unwrap();
    engine
        .record_wake(OWNER, day(13), wake(7, 0), at(13, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(13, 8, 0), false, at(13, 8, 0)).unwrap();
    engine.log_event(OWNER, at(13, 9, 30), false, at(13, 9, 30)).unwrap();

    let now = at(13, 22, 0);
    let summary = engine.progression_summary(OWNER, now).unwrap();
    let authoritative = engine.authoritative_streak(OWNER, now).unwrap();
    assert_eq!(summary.streak, authoritative);
    assert_eq!(authoritative.current, 2, "maintenance day bridges the run");
}

#[test]
fn test_deep_retroactive_delete_realigns_streak_counters() {
    let engine = engine();
    // Day 10 is the cold-start day; days 11 through 22 each score positive
    // with a single, steadily later first event.
    engine
        .record_wake(OWNER, day(10), wake(7, 0), at(10, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(10, 9, 0), false, at(10, 9, 0)).unwrap();
    let mut day_11_event = String::new();
    for d in 11..=22 {
        engine
            .record_wake(OWNER, day(d), wake(7, 0), at(d, 7, 0))
            .unwrap();
        let smoked_at = at(d, 9, 0) + Duration::minutes(10 * (d as i64 - 10));
        let outcome = engine.log_event(OWNER, smoked_at, false, smoked_at).unwrap();
        assert!(outcome.day_score > 0, "day {d} must score positive");
        if d == 11 {
            day_11_event = outcome.event_id;
        }
    }
    let now = at(22, 23, 0);
    assert_eq!(engine.authoritative_streak(OWNER, now).unwrap().current, 12);

    // Deleting day 11's only event silences that day eleven days later:
    // every counter after it, including those past the 7-day scoring
    // horizon, must re-chain.
    engine.delete_event(OWNER, &day_11_event, now).unwrap();
    let summary = engine.progression_summary(OWNER, now).unwrap();
    let authoritative = engine.authoritative_streak(OWNER, now).unwrap();
    assert_eq!(summary.streak, authoritative);
    assert_eq!(authoritative.current, 11);
    assert_eq!(authoritative.best, 11);
}

#[test]
fn test_trailing_quiet_days_break_fast_path_streak() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    engine.log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30)).unwrap();

    // Three quiet days later the run is broken, record or no record.
    let now = at(14, 12, 0);
    let summary = engine.progression_summary(OWNER, now).unwrap();
    let authoritative = engine.authoritative_streak(OWNER, now).unwrap();
    assert_eq!(summary.streak, authoritative);
    assert_eq!(summary.streak.current, 0);
    assert_eq!(summary.streak.best, 1);
}

#[test]
fn test_recompute_history_is_idempotent() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    engine.log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30)).unwrap();

    let now = at(11, 22, 0);
    let first = engine.recompute_history(OWNER, None, now).unwrap();
    assert_eq!(first.days_rebuilt, 2);
    let total_after_first = engine.progression_summary(OWNER, now).unwrap().total_score;

    let second = engine.recompute_history(OWNER, None, now).unwrap();
    assert_eq!(second.days_rebuilt, 2);
    let total_after_second = engine.progression_summary(OWNER, now).unwrap().total_score;
    assert_eq!(total_after_first, total_after_second);

    let record = engine.store().daily_record(OWNER, day(11)).unwrap().unwrap();
    assert_eq!(record.score, 30);
}

#[test]
fn test_target_interval_never_decreases_across_days() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    let first = engine
        .store()
        .progression(OWNER)
        .unwrap()
        .unwrap()
        .current_target_interval
        .unwrap();

    engine
        .record_wake(OWNER, day(12), wake(7, 0), at(12, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(12, 8, 0), false, at(12, 8, 0)).unwrap();
    let mut previous = first;
    for d in 13..=15 {
        engine.log_event(OWNER, at(d, 8, 0), false, at(d, 8, 0)).unwrap();
        let target = engine
            .store()
            .progression(OWNER)
            .unwrap()
            .unwrap()
            .current_target_interval
            .unwrap();
        assert!(target >= previous, "target interval regressed on day {d}");
        previous = target;
    }
}

#[test]
fn test_reset_account_clears_progression() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    engine.log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30)).unwrap();

    engine.reset_account(OWNER, at(11, 23, 0)).unwrap();
    let state = engine.store().progression(OWNER).unwrap().unwrap();
    assert_eq!(state.total_score, 0);
    assert!(state.current_target_interval.is_none());
    let settings = engine.store().settings(OWNER).unwrap();
    assert_eq!(settings.last_reset_on, Some(day(11)));
}

#[test]
fn test_monthly_shield_requires_summit_score() {
    let engine = engine();
    let err = engine.claim_monthly_shield(OWNER, at(11, 9, 0)).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Shield(ShieldError::ScoreTooLow { .. })
    ));

    let mut state = ProgressionState::new(OWNER);
    state.total_score = 200_000;
    engine.store().put_progression(&state).unwrap();
    let count = engine.claim_monthly_shield(OWNER, at(11, 9, 0)).unwrap();
    assert_eq!(count, 1);
    let err = engine.claim_monthly_shield(OWNER, at(20, 9, 0)).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Shield(ShieldError::AlreadyClaimedThisMonth)
    ));
}

#[test]
fn test_wake_anchors_first_target() {
    let engine = engine();
    seed_baseline_day(&engine);
    // No wake entry on the 11th: the axis falls back to the default offset
    // and the first event always lands on target.
    let outcome = engine
        .log_event(OWNER, at(11, 9, 45), false, at(11, 9, 45))
        .unwrap();
    assert_eq!(outcome.event_points, 0);

    // Recording the wake afterwards rescores the day against the real axis:
    // 165 minutes since wake against a 60-minute first offset target gives
    // diff +105 in the deep-late zone, 105 * 1.5 = 158 points.
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 10, 0))
        .unwrap();
    let record = engine.store().daily_record(OWNER, day(11)).unwrap().unwrap();
    assert_eq!(record.score, 158);
}

#[test]
fn test_quiet_day_breaks_streak() {
    let engine = engine();
    seed_baseline_day(&engine);
    engine
        .record_wake(OWNER, day(11), wake(7, 0), at(11, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    engine.log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30)).unwrap();

    // Nothing on the 12th or 13th; a positive 14th restarts at 1.
    engine
        .record_wake(OWNER, day(14), wake(7, 0), at(14, 7, 0))
        .unwrap();
    engine.log_event(OWNER, at(14, 8, 0), false, at(14, 8, 0)).unwrap();
    let outcome = engine
        .log_event(OWNER, at(14, 9, 30), false, at(14, 9, 30))
        .unwrap();
    assert_eq!(outcome.streak.current, 1);
    assert_eq!(outcome.streak.best, 1);

    let authoritative = engine.authoritative_streak(OWNER, at(14, 22, 0)).unwrap();
    assert_eq!(outcome.streak, authoritative);
}

#[test]
fn test_future_timestamp_rejected() {
    let engine = engine();
    let now = at(10, 8, 0);
    let err = engine
        .log_event(OWNER, now + Duration::minutes(10), false, now)
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    // Within the five minute tolerance is accepted.
    engine
        .log_event(OWNER, now + Duration::minutes(4), false, now)
        .unwrap();
}
