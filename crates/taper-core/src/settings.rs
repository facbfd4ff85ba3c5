//! Typed per-user settings.
//!
//! Replaces the original's string-keyed settings bag with one serde struct
//! persisted behind the store seam. Pack economics feed the savings estimate
//! exposed to the badge evaluator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-user configuration and small bits of progression bookkeeping that do
/// not belong in [`crate::records::ProgressionState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Price of one pack, in the user's currency
    pub pack_price: f64,
    /// Cigarettes per pack
    pub units_per_pack: u32,
    /// Daily goal to start from before any dynamic tier exists
    pub initial_daily_goal: u32,
    /// Monotonically non-increasing stored goal tier
    pub stored_tier: Option<u32>,
    /// Tier last shown to the user, for achievement detection
    pub last_displayed_tier: Option<u32>,
    /// Day of the most recent account reset, if any
    pub last_reset_on: Option<NaiveDate>,
    /// Lifetime count of shields consumed
    pub shields_used: u32,
    /// Day the monthly bonus shield was last claimed
    pub monthly_shield_claimed_on: Option<NaiveDate>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            pack_price: 8.0,
            units_per_pack: 20,
            initial_daily_goal: 20,
            stored_tier: None,
            last_displayed_tier: None,
            last_reset_on: None,
            shields_used: 0,
            monthly_shield_claimed_on: None,
        }
    }
}

impl UserSettings {
    /// Price of a single cigarette.
    pub fn unit_price(&self) -> f64 {
        if self.units_per_pack == 0 {
            return 0.0;
        }
        self.pack_price / self.units_per_pack as f64
    }

    /// Money saved by smoking `actual_units` instead of the baseline amount
    /// over `days` days.
    pub fn savings_estimate(&self, baseline_daily: f64, actual_units: u64, days: u32) -> f64 {
        let expected = baseline_daily * days as f64;
        let avoided = (expected - actual_units as f64).max(0.0);
        avoided * self.unit_price()
    }
}
