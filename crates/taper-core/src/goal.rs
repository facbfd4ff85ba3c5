//! Goal tier engine: the dynamically tightening daily event-count goal.
//!
//! The tier chases the trailing 14-day average downward and never climbs
//! back up; the stored tier is only rewritten when it actually changes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::settings::UserSettings;
use crate::store::EventStore;

/// Trailing window feeding the dynamic tier.
pub const GOAL_WINDOW_DAYS: u32 = 14;

/// Outcome of a goal tier evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalEvaluation {
    /// Tier in force after this evaluation
    pub current_tier: u32,
    /// The next milestone below, when one exists
    pub next_tier: Option<u32>,
    /// True when the tier dropped relative to what the user last saw
    pub achieved: bool,
    /// True when the stored tier changed and must be persisted
    pub tier_changed: bool,
}

/// Tier implied by the trailing average alone: one below the floored
/// average, never negative.
pub fn dynamic_tier(trailing_average: f64) -> u32 {
    (trailing_average.floor() as i64 - 1).max(0) as u32
}

/// Evaluate the goal tier for `today`, updating `settings` in place when the
/// stored or displayed tier moves. The caller persists settings when
/// `tier_changed || achieved`.
pub fn evaluate<S: EventStore + ?Sized>(
    store: &S,
    settings: &mut UserSettings,
    owner: &str,
    today: NaiveDate,
) -> Result<GoalEvaluation, StoreError> {
    let baseline = settings.stored_tier.unwrap_or(settings.initial_daily_goal);
    let current = match store.average_daily_count(owner, GOAL_WINDOW_DAYS, today)? {
        Some(avg) => baseline.min(dynamic_tier(avg)),
        None => baseline,
    };

    let tier_changed = settings.stored_tier != Some(current);
    if tier_changed {
        settings.stored_tier = Some(current);
    }

    let achieved = match settings.last_displayed_tier {
        Some(last) => current < last,
        None => false,
    };
    settings.last_displayed_tier = Some(current);

    let next_tier = if current > 0 { Some(current - 1) } else { None };
    Ok(GoalEvaluation {
        current_tier: current,
        next_tier,
        achieved,
        tier_changed,
    })
}
