use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use taper_core::maintenance::{flagged_day_in_week, iso_week_range};

use super::{date_or_today, open_engine};

#[derive(Subcommand)]
pub enum MaintenanceAction {
    /// Flag a day as a maintenance (streak freeze) day
    Activate {
        /// Day to flag (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Clear the flag and score the day normally again
    Deactivate {
        /// Flagged day (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print this week's maintenance status
    Status,
}

pub fn run(user: &str, action: MaintenanceAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine()?;
    let now = Utc::now();

    match action {
        MaintenanceAction::Activate { date } => {
            let record = engine.activate_maintenance_day(user, date_or_today(date, now), now)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        MaintenanceAction::Deactivate { date } => {
            let record = engine.deactivate_maintenance_day(user, date_or_today(date, now), now)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        MaintenanceAction::Status => {
            let today = now.date_naive();
            let flagged = flagged_day_in_week(engine.store(), user, today)?;
            let (monday, sunday) = iso_week_range(today);
            let status = serde_json::json!({
                "week_start": monday,
                "week_end": sunday,
                "flagged_day": flagged,
                "available": flagged.is_none(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
