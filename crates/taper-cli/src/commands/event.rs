use chrono::{NaiveDate, Utc};
use clap::Subcommand;

use super::{date_or_today, open_engine, parse_time, parse_timestamp};

#[derive(Subcommand)]
pub enum EventAction {
    /// Log a smoke event (now, or retroactively with --at)
    Log {
        /// Timestamp of the event, RFC 3339 or `YYYY-MM-DDTHH:MM`
        #[arg(long)]
        at: Option<String>,
    },
    /// Record the wake time for a day
    Wake {
        /// Wake time, `HH:MM`
        #[arg(long)]
        time: String,
        /// Day the wake time belongs to (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete a logged event by id
    Delete {
        /// Event id as returned by `event log`
        id: String,
    },
}

pub fn run(user: &str, action: EventAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine()?;
    let now = Utc::now();

    match action {
        EventAction::Log { at } => {
            let (smoked_at, retroactive) = match at {
                Some(raw) => (parse_timestamp(&raw)?, true),
                None => (now, false),
            };
            let outcome = engine.log_event(user, smoked_at, retroactive, now)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        EventAction::Wake { time, date } => {
            let date = date_or_today(date, now);
            engine.record_wake(user, date, parse_time(&time)?, now)?;
            let record = engine.daily_score(user, date, now)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        EventAction::Delete { id } => {
            let outcome = engine.delete_event(user, &id, now)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }
    Ok(())
}
