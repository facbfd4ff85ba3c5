pub mod event;
pub mod maintenance;
pub mod score;
pub mod settings;
pub mod shield;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use taper_core::{Engine, SqliteStore};

/// Engine over the on-disk store; every command opens its own handle.
pub fn open_engine() -> Result<Engine<SqliteStore>, Box<dyn std::error::Error>> {
    Ok(Engine::new(SqliteStore::open()?))
}

/// Parse a timestamp given as RFC 3339 or as local-naive `YYYY-MM-DDTHH:MM`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let naive = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))?;
    Ok(naive.and_utc())
}

/// Parse a clock time given as `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, Box<dyn std::error::Error>> {
    Ok(NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))?)
}

/// The date a command targets: an explicit `--date`, or today.
pub fn date_or_today(date: Option<NaiveDate>, now: DateTime<Utc>) -> NaiveDate {
    date.unwrap_or_else(|| now.date_naive())
}
