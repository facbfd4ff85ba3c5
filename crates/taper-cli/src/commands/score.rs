use chrono::{NaiveDate, Utc};
use clap::Subcommand;

use super::{date_or_today, open_engine};

#[derive(Subcommand)]
pub enum ScoreAction {
    /// Print the daily score record for a day
    Show {
        /// Day to score (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the progression summary (rank, streak, goal, shields)
    Summary,
    /// Rebuild daily records and streak counters from raw events
    Recompute {
        /// First day to rebuild (defaults to the first logged event)
        #[arg(long)]
        since: Option<NaiveDate>,
    },
}

pub fn run(user: &str, action: ScoreAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine()?;
    let now = Utc::now();

    match action {
        ScoreAction::Show { date } => {
            let record = engine.daily_score(user, date_or_today(date, now), now)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        ScoreAction::Summary => {
            let summary = engine.progression_summary(user, now)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        ScoreAction::Recompute { since } => {
            let summary = engine.recompute_history(user, since, now)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
