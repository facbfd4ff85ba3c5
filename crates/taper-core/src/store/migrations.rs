//! Schema migrations for the SQLite store.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current version.

use indoc::indoc;
use rusqlite::{Connection, Result as SqliteResult};

/// Apply all pending migrations.
///
/// # Errors
/// Returns an error if a migration statement fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// v1: events, wakes, daily records, progression state, settings.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS smoke_events (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            smoked_at TEXT NOT NULL,
            day TEXT NOT NULL,
            retroactive INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_smoke_events_owner_day
            ON smoke_events (owner, day);

        CREATE TABLE IF NOT EXISTS wake_events (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            day TEXT NOT NULL,
            wake_time TEXT NOT NULL,
            UNIQUE (owner, day)
        );

        CREATE TABLE IF NOT EXISTS daily_records (
            owner TEXT NOT NULL,
            day TEXT NOT NULL,
            score INTEGER NOT NULL,
            event_count INTEGER NOT NULL,
            streak INTEGER NOT NULL,
            best_streak INTEGER NOT NULL,
            avg_interval REAL,
            target_interval REAL,
            is_maintenance_day INTEGER NOT NULL DEFAULT 0,
            shield_applied INTEGER NOT NULL DEFAULT 0,
            multiplier_applied REAL,
            computed_at TEXT NOT NULL,
            PRIMARY KEY (owner, day)
        );

        CREATE TABLE IF NOT EXISTS progression_state (
            owner TEXT PRIMARY KEY,
            shields_count INTEGER NOT NULL,
            permanent_multiplier REAL NOT NULL,
            total_score INTEGER NOT NULL,
            current_target_interval REAL,
            interval_updated_on TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS user_settings (
            owner TEXT PRIMARY KEY,
            body TEXT NOT NULL
        );
    "})?;
    set_schema_version(conn, 1)
}

/// v2: temporary bonuses and unlocked badges.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS temporary_bonuses (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            kind TEXT NOT NULL,
            value REAL NOT NULL,
            source_badge TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_bonuses_owner ON temporary_bonuses (owner);

        CREATE TABLE IF NOT EXISTS unlocked_badges (
            owner TEXT NOT NULL,
            badge_code TEXT NOT NULL,
            unlocked_at TEXT NOT NULL,
            PRIMARY KEY (owner, badge_code)
        );
    "})?;
    set_schema_version(conn, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 2);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 2);
    }
}
