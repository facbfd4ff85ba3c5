//! SQLite-backed store.
//!
//! Timestamps are stored as RFC3339 text, calendar days as `YYYY-MM-DD`.
//! Settings are stored as a JSON blob per owner; everything else is
//! first-class columns.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::event::{SmokeEvent, WakeEvent};
use crate::records::{BonusKind, DailyScoreRecord, ProgressionState, TemporaryBonus, UnlockedBadge};
use crate::settings::UserSettings;

use super::{data_dir, migrations, EventStore, StateStore};

// === Helper functions ===

fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_day(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| StoreError::QueryFailed(format!("bad date '{s}': {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::QueryFailed(format!("bad timestamp '{s}': {e}")))
}

fn parse_time(s: &str) -> Result<NaiveTime, StoreError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .map_err(|e| StoreError::QueryFailed(format!("bad time '{s}': {e}")))
}

fn format_bonus_kind(kind: BonusKind) -> &'static str {
    match kind {
        BonusKind::ScorePercent => "score_percent",
        BonusKind::Multiplier => "multiplier",
        BonusKind::Shield => "shield",
        BonusKind::MaintenanceDay => "maintenance_day",
    }
}

fn parse_bonus_kind(s: &str) -> BonusKind {
    match s {
        "multiplier" => BonusKind::Multiplier,
        "shield" => BonusKind::Shield,
        "maintenance_day" => BonusKind::MaintenanceDay,
        _ => BonusKind::ScorePercent,
    }
}

fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<(String, String, String, bool)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// SQLite implementation of both store traits.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (and migrate) the store at the default data directory.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("taper.db");
        Self::open_at(&path)
    }

    /// Open (and migrate) the store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open an in-memory store, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn event_from_parts(
        &self,
        (id, owner, smoked_at, retroactive): (String, String, String, bool),
    ) -> Result<SmokeEvent, StoreError> {
        Ok(SmokeEvent {
            id,
            owner,
            smoked_at: parse_datetime(&smoked_at)?,
            retroactive,
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<RecordRow> {
        Ok(RecordRow {
            owner: row.get(0)?,
            day: row.get(1)?,
            score: row.get(2)?,
            event_count: row.get(3)?,
            streak: row.get(4)?,
            best_streak: row.get(5)?,
            avg_interval: row.get(6)?,
            target_interval: row.get(7)?,
            is_maintenance_day: row.get(8)?,
            shield_applied: row.get(9)?,
            multiplier_applied: row.get(10)?,
            computed_at: row.get(11)?,
        })
    }
}

/// Raw daily_records row before date/timestamp parsing.
struct RecordRow {
    owner: String,
    day: String,
    score: i64,
    event_count: u32,
    streak: u32,
    best_streak: u32,
    avg_interval: Option<f64>,
    target_interval: Option<f64>,
    is_maintenance_day: bool,
    shield_applied: bool,
    multiplier_applied: Option<f64>,
    computed_at: String,
}

impl RecordRow {
    fn into_record(self) -> Result<DailyScoreRecord, StoreError> {
        Ok(DailyScoreRecord {
            owner: self.owner,
            date: parse_day(&self.day)?,
            score: self.score,
            event_count: self.event_count,
            streak: self.streak,
            best_streak: self.best_streak,
            avg_interval: self.avg_interval,
            target_interval: self.target_interval,
            is_maintenance_day: self.is_maintenance_day,
            shield_applied: self.shield_applied,
            multiplier_applied: self.multiplier_applied,
            computed_at: parse_datetime(&self.computed_at)?,
        })
    }
}

const RECORD_COLUMNS: &str = "owner, day, score, event_count, streak, best_streak, \
     avg_interval, target_interval, is_maintenance_day, shield_applied, \
     multiplier_applied, computed_at";

impl EventStore for SqliteStore {
    fn insert_event(&self, event: &SmokeEvent) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO smoke_events (id, owner, smoked_at, day, retroactive)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id,
                event.owner,
                event.smoked_at.to_rfc3339(),
                format_day(event.date()),
                event.retroactive,
            ],
        )?;
        Ok(())
    }

    fn delete_event(
        &self,
        owner: &str,
        event_id: &str,
    ) -> Result<Option<SmokeEvent>, StoreError> {
        let parts = self
            .conn
            .query_row(
                "SELECT id, owner, smoked_at, retroactive FROM smoke_events
                 WHERE owner = ?1 AND id = ?2",
                params![owner, event_id],
                row_to_event,
            )
            .optional()?;
        let Some(parts) = parts else {
            return Ok(None);
        };
        self.conn.execute(
            "DELETE FROM smoke_events WHERE owner = ?1 AND id = ?2",
            params![owner, event_id],
        )?;
        Ok(Some(self.event_from_parts(parts)?))
    }

    fn events_by_date(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Vec<SmokeEvent>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, smoked_at, retroactive FROM smoke_events
             WHERE owner = ?1 AND day = ?2 ORDER BY smoked_at",
        )?;
        let rows = stmt.query_map(params![owner, format_day(date)], row_to_event)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(self.event_from_parts(row?)?);
        }
        Ok(out)
    }

    fn events_by_range(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, Vec<SmokeEvent>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, smoked_at, retroactive FROM smoke_events
             WHERE owner = ?1 AND day >= ?2 AND day <= ?3 ORDER BY smoked_at",
        )?;
        let rows = stmt.query_map(
            params![owner, format_day(start), format_day(end)],
            row_to_event,
        )?;
        let mut out: BTreeMap<NaiveDate, Vec<SmokeEvent>> = BTreeMap::new();
        for row in rows {
            let event = self.event_from_parts(row?)?;
            out.entry(event.date()).or_default().push(event);
        }
        Ok(out)
    }

    fn upsert_wake(&self, wake: &WakeEvent) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO wake_events (id, owner, day, wake_time) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (owner, day) DO UPDATE SET wake_time = excluded.wake_time",
            params![
                wake.id,
                wake.owner,
                format_day(wake.date),
                wake.wake_time.format("%H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    fn wake_by_date(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Option<WakeEvent>, StoreError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT id, wake_time FROM wake_events WHERE owner = ?1 AND day = ?2",
                params![owner, format_day(date)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((id, time)) => Ok(Some(WakeEvent {
                id,
                owner: owner.to_string(),
                date,
                wake_time: parse_time(&time)?,
            })),
            None => Ok(None),
        }
    }

    fn wake_by_range(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, WakeEvent>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, day, wake_time FROM wake_events
             WHERE owner = ?1 AND day >= ?2 AND day <= ?3",
        )?;
        let rows = stmt.query_map(
            params![owner, format_day(start), format_day(end)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (id, day, time) = row?;
            let date = parse_day(&day)?;
            out.insert(
                date,
                WakeEvent {
                    id,
                    owner: owner.to_string(),
                    date,
                    wake_time: parse_time(&time)?,
                },
            );
        }
        Ok(out)
    }

    fn count_by_date(&self, owner: &str, date: NaiveDate) -> Result<u32, StoreError> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM smoke_events WHERE owner = ?1 AND day = ?2",
            params![owner, format_day(date)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn first_event_date(&self, owner: &str) -> Result<Option<NaiveDate>, StoreError> {
        let day: Option<String> = self
            .conn
            .query_row(
                "SELECT MIN(day) FROM smoke_events WHERE owner = ?1",
                params![owner],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        day.map(|d| parse_day(&d)).transpose()
    }

    fn total_count(&self, owner: &str) -> Result<u64, StoreError> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM smoke_events WHERE owner = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn total_count_until(&self, owner: &str, before: NaiveDate) -> Result<u64, StoreError> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM smoke_events WHERE owner = ?1 AND day < ?2",
            params![owner, format_day(before)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn average_daily_count(
        &self,
        owner: &str,
        window_days: u32,
        today: NaiveDate,
    ) -> Result<Option<f64>, StoreError> {
        let start = today - chrono::Duration::days(window_days as i64);
        let avg: Option<f64> = self
            .conn
            .query_row(
                "SELECT AVG(n) FROM (
                     SELECT COUNT(*) AS n FROM smoke_events
                     WHERE owner = ?1 AND day >= ?2 AND day < ?3
                     GROUP BY day
                 )",
                params![owner, format_day(start), format_day(today)],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(avg)
    }
}

impl StateStore for SqliteStore {
    fn progression(&self, owner: &str) -> Result<Option<ProgressionState>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT shields_count, permanent_multiplier, total_score,
                        current_target_interval, interval_updated_on, version
                 FROM progression_state WHERE owner = ?1",
                params![owner],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, u64>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((shields, perm, total, interval, updated_on, version)) = row else {
            return Ok(None);
        };
        Ok(Some(ProgressionState {
            owner: owner.to_string(),
            shields_count: shields,
            permanent_multiplier: perm,
            total_score: total.max(0) as u64,
            current_target_interval: interval,
            interval_updated_on: updated_on.map(|d| parse_day(&d)).transpose()?,
            version,
        }))
    }

    fn put_progression(&self, state: &ProgressionState) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "INSERT INTO progression_state
                 (owner, shields_count, permanent_multiplier, total_score,
                  current_target_interval, interval_updated_on, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7 + 1)
             ON CONFLICT (owner) DO UPDATE SET
                 shields_count = excluded.shields_count,
                 permanent_multiplier = excluded.permanent_multiplier,
                 total_score = excluded.total_score,
                 current_target_interval = excluded.current_target_interval,
                 interval_updated_on = excluded.interval_updated_on,
                 version = excluded.version
             WHERE progression_state.version = ?7",
            params![
                state.owner,
                state.shields_count,
                state.permanent_multiplier,
                state.total_score as i64,
                state.current_target_interval,
                state.interval_updated_on.map(format_day),
                state.version,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::Conflict(format!(
                "progression state for {}",
                state.owner
            )));
        }
        Ok(())
    }

    fn daily_record(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyScoreRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM daily_records WHERE owner = ?1 AND day = ?2"
                ),
                params![owner, format_day(date)],
                Self::row_to_record,
            )
            .optional()?;
        row.map(RecordRow::into_record).transpose()
    }

    fn latest_daily_record(
        &self,
        owner: &str,
    ) -> Result<Option<DailyScoreRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM daily_records
                     WHERE owner = ?1 ORDER BY day DESC LIMIT 1"
                ),
                params![owner],
                Self::row_to_record,
            )
            .optional()?;
        row.map(RecordRow::into_record).transpose()
    }

    fn latest_record_before(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyScoreRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM daily_records
                     WHERE owner = ?1 AND day < ?2 ORDER BY day DESC LIMIT 1"
                ),
                params![owner, format_day(date)],
                Self::row_to_record,
            )
            .optional()?;
        row.map(RecordRow::into_record).transpose()
    }

    fn upsert_daily_record(&self, record: &DailyScoreRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO daily_records
                 (owner, day, score, event_count, streak, best_streak, avg_interval,
                  target_interval, is_maintenance_day, shield_applied,
                  multiplier_applied, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT (owner, day) DO UPDATE SET
                 score = excluded.score,
                 event_count = excluded.event_count,
                 streak = excluded.streak,
                 best_streak = excluded.best_streak,
                 avg_interval = excluded.avg_interval,
                 target_interval = excluded.target_interval,
                 is_maintenance_day = excluded.is_maintenance_day,
                 shield_applied = excluded.shield_applied,
                 multiplier_applied = excluded.multiplier_applied,
                 computed_at = excluded.computed_at",
            params![
                record.owner,
                format_day(record.date),
                record.score,
                record.event_count,
                record.streak,
                record.best_streak,
                record.avg_interval,
                record.target_interval,
                record.is_maintenance_day,
                record.shield_applied,
                record.multiplier_applied,
                record.computed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn daily_records_range(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyScoreRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM daily_records
             WHERE owner = ?1 AND day >= ?2 AND day <= ?3 ORDER BY day"
        ))?;
        let rows = stmt.query_map(
            params![owner, format_day(start), format_day(end)],
            Self::row_to_record,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }

    fn insert_bonus(&self, bonus: &TemporaryBonus) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO temporary_bonuses
                 (id, owner, kind, value, source_badge, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                bonus.id,
                bonus.owner,
                format_bonus_kind(bonus.kind),
                bonus.value,
                bonus.source_badge,
                bonus.expires_at.to_rfc3339(),
                bonus.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn active_bonuses(
        &self,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<TemporaryBonus>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, value, source_badge, expires_at, created_at
             FROM temporary_bonuses WHERE owner = ?1 AND expires_at > ?2",
        )?;
        let rows = stmt.query_map(params![owner, now.to_rfc3339()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, kind, value, source_badge, expires_at, created_at) = row?;
            out.push(TemporaryBonus {
                id,
                owner: owner.to_string(),
                kind: parse_bonus_kind(&kind),
                value,
                source_badge,
                expires_at: parse_datetime(&expires_at)?,
                created_at: parse_datetime(&created_at)?,
            });
        }
        Ok(out)
    }

    fn insert_badge(&self, badge: &UnlockedBadge) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO unlocked_badges (owner, badge_code, unlocked_at)
             VALUES (?1, ?2, ?3)",
            params![badge.owner, badge.badge_code, badge.unlocked_at.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    fn settings(&self, owner: &str) -> Result<UserSettings, StoreError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM user_settings WHERE owner = ?1",
                params![owner],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => serde_json::from_str(&body)
                .map_err(|e| StoreError::QueryFailed(format!("bad settings blob: {e}"))),
            None => Ok(UserSettings::default()),
        }
    }

    fn put_settings(&self, owner: &str, settings: &UserSettings) -> Result<(), StoreError> {
        let body = serde_json::to_string(settings)
            .map_err(|e| StoreError::QueryFailed(format!("settings encode: {e}")))?;
        self.conn.execute(
            "INSERT INTO user_settings (owner, body) VALUES (?1, ?2)
             ON CONFLICT (owner) DO UPDATE SET body = excluded.body",
            params![owner, body],
        )?;
        Ok(())
    }
}
