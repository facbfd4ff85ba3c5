//! Persistence tests for the SQLite store: survives reopen, migrations are
//! idempotent, and the engine runs unchanged on top of it.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use tempfile::TempDir;

use taper_core::store::{EventStore, SqliteStore, StateStore};
use taper_core::{Engine, SmokeEvent, UserSettings, WakeEvent};

const OWNER: &str = "u1";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn at(d: u32, h: u32, min: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, h, min, 0).unwrap()
}

#[test]
fn test_events_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taper.db");

    {
        let store = SqliteStore::open_at(&path).unwrap();
        let event = SmokeEvent::new(OWNER, at(10, 8, 0), false, at(10, 8, 0)).unwrap();
        store.insert_event(&event).unwrap();
        store
            .upsert_wake(&WakeEvent::new(
                OWNER,
                day(10),
                NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            ))
            .unwrap();
    }

    let store = SqliteStore::open_at(&path).unwrap();
    let events = store.events_by_date(OWNER, day(10)).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].smoked_at, at(10, 8, 0));
    let wake = store.wake_by_date(OWNER, day(10)).unwrap().unwrap();
    assert_eq!(wake.wake_time, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
}

#[test]
fn test_settings_round_trip_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taper.db");

    {
        let store = SqliteStore::open_at(&path).unwrap();
        let mut settings = UserSettings::default();
        settings.pack_price = 11.5;
        settings.initial_daily_goal = 15;
        store.put_settings(OWNER, &settings).unwrap();
    }

    let store = SqliteStore::open_at(&path).unwrap();
    let settings = store.settings(OWNER).unwrap();
    assert_eq!(settings.pack_price, 11.5);
    assert_eq!(settings.initial_daily_goal, 15);
    // Unknown owners still get defaults.
    let other = store.settings("someone-else").unwrap();
    assert_eq!(other.pack_price, UserSettings::default().pack_price);
}

#[test]
fn test_reopening_runs_migrations_idempotently() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taper.db");
    for _ in 0..3 {
        let store = SqliteStore::open_at(&path).unwrap();
        assert!(store.first_event_date(OWNER).unwrap().is_none());
    }
}

#[test]
fn test_engine_workflow_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taper.db");
    let engine = Engine::new(SqliteStore::open_at(&path).unwrap());

    engine
        .record_wake(
            OWNER,
            day(10),
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            at(10, 7, 0),
        )
        .unwrap();
    for h in [8, 9, 10] {
        engine.log_event(OWNER, at(10, h, 0), false, at(10, h, 0)).unwrap();
    }
    engine
        .record_wake(
            OWNER,
            day(11),
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            at(11, 7, 0),
        )
        .unwrap();
    engine.log_event(OWNER, at(11, 8, 0), false, at(11, 8, 0)).unwrap();
    let outcome = engine
        .log_event(OWNER, at(11, 9, 30), false, at(11, 9, 30))
        .unwrap();
    assert_eq!(outcome.day_score, 30);
    assert_eq!(outcome.streak.current, 1);

    // Everything is durable: a second engine over the same file agrees.
    drop(engine);
    let engine = Engine::new(SqliteStore::open_at(&path).unwrap());
    let summary = engine.progression_summary(OWNER, at(11, 22, 0)).unwrap();
    assert_eq!(summary.total_score, 30);
    assert_eq!(summary.streak.current, 1);
    let record = engine.store().daily_record(OWNER, day(11)).unwrap().unwrap();
    assert_eq!(record.score, 30);
    assert_eq!(record.event_count, 2);
}

#[test]
fn test_optimistic_versioning_detects_conflict() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taper.db");
    let store = SqliteStore::open_at(&path).unwrap();

    let mut state = taper_core::ProgressionState::new(OWNER);
    store.put_progression(&state).unwrap();
    state = store.progression(OWNER).unwrap().unwrap();

    let mut stale = state.clone();
    state.total_score = 100;
    store.put_progression(&state).unwrap();

    stale.total_score = 50;
    let err = store.put_progression(&stale).unwrap_err();
    assert!(matches!(err, taper_core::StoreError::Conflict(_)));

    let fresh = store.progression(OWNER).unwrap().unwrap();
    assert_eq!(fresh.total_score, 100);
}
