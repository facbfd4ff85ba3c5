//! Persisted aggregate records: daily scores, progression state, bonuses.
//!
//! A [`DailyScoreRecord`] is the durable cache of one day's computation and
//! the carrier of the incrementally maintained streak counters. A
//! [`ProgressionState`] row is the per-user singleton mutated by rank,
//! interval, and shield logic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One per (owner, date); upserted after every mutation or batch recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyScoreRecord {
    /// Owning user id
    pub owner: String,
    /// Calendar day
    pub date: NaiveDate,
    /// Aggregated score for the day (shield effect already applied)
    pub score: i64,
    /// Number of smoke events logged that day
    pub event_count: u32,
    /// Current streak as of this day
    pub streak: u32,
    /// Best streak ever as of this day
    pub best_streak: u32,
    /// Mean spacing between the day's events, when computable
    pub avg_interval: Option<f64>,
    /// Target spacing interval in force on this day
    pub target_interval: Option<f64>,
    /// Whether the user froze this day as a maintenance day
    pub is_maintenance_day: bool,
    /// Whether a shield zeroed this day's negative subtotal
    pub shield_applied: bool,
    /// Combined multiplier applied to the day's events, when scored
    pub multiplier_applied: Option<f64>,
    /// When this record was last computed
    pub computed_at: DateTime<Utc>,
}

impl DailyScoreRecord {
    /// Create an empty (zero-score) record for a day, e.g. as a maintenance
    /// placeholder before any event exists.
    pub fn placeholder(owner: impl Into<String>, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            owner: owner.into(),
            date,
            score: 0,
            event_count: 0,
            streak: 0,
            best_streak: 0,
            avg_interval: None,
            target_interval: None,
            is_maintenance_day: false,
            shield_applied: false,
            multiplier_applied: None,
            computed_at: now,
        }
    }

    /// True when the day keeps a streak alive: strictly positive score, or a
    /// shielded day regardless of its remaining score.
    pub fn streak_positive(&self) -> bool {
        self.score > 0 || self.shield_applied
    }
}

/// Per-user progression singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionState {
    /// Owning user id
    pub owner: String,
    /// Consumable shields on hand
    pub shields_count: u32,
    /// Permanent multiplier earned outside the rank table
    pub permanent_multiplier: f64,
    /// Cumulative score, clamped at zero after any negative adjustment
    pub total_score: u64,
    /// Current target spacing interval in minutes, once established
    pub current_target_interval: Option<f64>,
    /// Day the target interval was last advanced to
    pub interval_updated_on: Option<NaiveDate>,
    /// Optimistic-concurrency version, bumped on every write
    pub version: u64,
}

impl ProgressionState {
    /// Fresh state for a user with no history.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            shields_count: 0,
            permanent_multiplier: 0.0,
            total_score: 0,
            current_target_interval: None,
            interval_updated_on: None,
            version: 0,
        }
    }

    /// Apply a signed score delta, clamping the total at zero.
    pub fn apply_score_delta(&mut self, delta: i64) {
        if delta >= 0 {
            self.total_score = self.total_score.saturating_add(delta as u64);
        } else {
            self.total_score = self.total_score.saturating_sub(delta.unsigned_abs());
        }
    }
}

/// Kinds of temporary bonuses granted by badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    /// Percentage boost applied to positive raw points
    ScorePercent,
    /// Additive multiplier bonus
    Multiplier,
    /// Grants a consumable shield
    Shield,
    /// Grants an extra maintenance day
    MaintenanceDay,
}

/// A time-limited bonus; expiry sweeping is owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporaryBonus {
    /// Unique id
    pub id: String,
    /// Owning user id
    pub owner: String,
    /// Bonus kind
    pub kind: BonusKind,
    /// Kind-specific magnitude (percent for ScorePercent, additive factor
    /// for Multiplier, count for Shield/MaintenanceDay)
    pub value: f64,
    /// Badge code that granted the bonus
    pub source_badge: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
    /// Grant instant
    pub created_at: DateTime<Utc>,
}

impl TemporaryBonus {
    /// Create a new bonus.
    pub fn new(
        owner: impl Into<String>,
        kind: BonusKind,
        value: f64,
        source_badge: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.into(),
            kind,
            value,
            source_badge: source_badge.into(),
            expires_at,
            created_at,
        }
    }

    /// Whether the bonus is still live at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// An awarded badge; append-only, unique per (owner, badge_code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockedBadge {
    /// Owning user id
    pub owner: String,
    /// Stable badge identifier
    pub badge_code: String,
    /// Award instant
    pub unlocked_at: DateTime<Utc>,
}
