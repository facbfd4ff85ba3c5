//! Scoring engine: deviation-to-points conversion and daily aggregation.
//!
//! Every event is scored against its predicted target minute. The deviation
//! in minutes passes through a zone multiplier (direction- and
//! magnitude-dependent), then the account's multiplier stack (rank bonus,
//! permanent multiplier), and finally any active percentage bonuses — which
//! only ever boost positive raw points.
//!
//! Two strategies exist: the legacy day-over-day step function kept for
//! accounts not yet migrated, and the canonical smoothed zone-multiplier
//! formula.

use serde::{Deserialize, Serialize};

/// Hard floor on a single event's points, whatever the deviation.
pub const EVENT_SCORE_FLOOR: i64 = -120;

/// Per-event malus of the legacy step function when smoking on schedule.
pub const LEGACY_ON_TARGET_MALUS: i64 = -2;

/// Scaling factor on the raw timing deviation.
///
/// Early zones (diff < 0) amplify the penalty with magnitude; late zones
/// (diff >= 0) reward larger spacing gains.
pub fn zone_multiplier(diff_minutes: f64) -> f64 {
    if diff_minutes < 0.0 {
        match diff_minutes.abs() {
            d if d <= 10.0 => 1.0,
            d if d <= 20.0 => 1.5,
            _ => 2.0,
        }
    } else {
        match diff_minutes {
            d if d <= 30.0 => 1.0,
            d if d <= 60.0 => 1.2,
            _ => 1.5,
        }
    }
}

/// Which scoring formula an account runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Fixed point buckets at +/-5/15/30/60 minutes, ignoring the
    /// multiplier stack. Kept for pre-migration accounts.
    LegacyStepFunction,
    /// Deviation x zone multiplier x account multipliers.
    #[default]
    SmoothedZoneMultiplier,
}

/// The account's multiplier stack at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierPolicy {
    /// Cumulative rank multiplier bonus
    pub rank_bonus: f64,
    /// Permanent multiplier from progression state
    pub permanent_multiplier: f64,
    /// Sum of active score-percent bonuses, in percent
    pub score_percent_total: f64,
}

impl MultiplierPolicy {
    /// Policy with no bonuses of any kind.
    pub fn neutral() -> Self {
        Self {
            rank_bonus: 0.0,
            permanent_multiplier: 0.0,
            score_percent_total: 0.0,
        }
    }

    /// Combined multiplier for a given deviation:
    /// `zone(diff) * (1 + rank_bonus + permanent_multiplier)`.
    pub fn total_multiplier(&self, diff_minutes: f64) -> f64 {
        zone_multiplier(diff_minutes) * (1.0 + self.rank_bonus + self.permanent_multiplier)
    }
}

impl Default for MultiplierPolicy {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Legacy step function: fixed buckets on the raw deviation.
///
/// Smoking exactly on schedule still costs [`LEGACY_ON_TARGET_MALUS`]; the
/// top bucket starts at one hour late, which is the smallest target interval
/// an account can ever hold, so beating the target by a full interval always
/// lands the +20.
pub fn legacy_step_points(diff_minutes: f64) -> i64 {
    match diff_minutes {
        d if d < -60.0 => -25,
        d if d < -30.0 => -18,
        d if d < -15.0 => -12,
        d if d < -5.0 => -6,
        d if d < 5.0 => LEGACY_ON_TARGET_MALUS,
        d if d < 15.0 => 4,
        d if d < 30.0 => 8,
        d if d < 60.0 => 12,
        _ => 20,
    }
}

/// Points for one event under the given strategy.
///
/// Canonical formula: `raw = diff * zone(diff) * (1 + rank + permanent)`;
/// positive raw values are then boosted by the active score-percent bonuses,
/// negative values never are. The result is rounded to the nearest integer
/// and floored at [`EVENT_SCORE_FLOOR`].
pub fn event_points(
    strategy: ScoringStrategy,
    diff_minutes: f64,
    policy: &MultiplierPolicy,
) -> i64 {
    let raw = match strategy {
        ScoringStrategy::LegacyStepFunction => legacy_step_points(diff_minutes) as f64,
        ScoringStrategy::SmoothedZoneMultiplier => {
            diff_minutes * policy.total_multiplier(diff_minutes)
        }
    };
    let boosted = if raw > 0.0 {
        raw * (1.0 + policy.score_percent_total / 100.0)
    } else {
        raw
    };
    (boosted.round() as i64).max(EVENT_SCORE_FLOOR)
}

/// One scored event inside a day breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventScore {
    /// Position within the day (0-based)
    pub index: usize,
    /// Predicted minutes-since-wake
    pub target_minutes: f64,
    /// Actual minutes-since-wake
    pub actual_minutes: f64,
    /// Deviation in minutes (actual - target)
    pub diff_minutes: f64,
    /// Zone multiplier applied
    pub zone_multiplier: f64,
    /// Final rounded points
    pub points: i64,
}

/// A fully scored day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayScore {
    /// Per-event contributions in timestamp order
    pub events: Vec<EventScore>,
    /// Sum of positive contributions
    pub positive_subtotal: i64,
    /// Sum of negative contributions (non-positive number)
    pub negative_subtotal: i64,
    /// Day total before any shield effect
    pub total: i64,
    /// True when no comparison history exists at all; the day is
    /// non-scorable and totals are zero. This is a sentinel, not an error.
    pub cold_start: bool,
}

impl DayScore {
    /// The cold-start sentinel: zero score, no comparison available.
    pub fn cold_start() -> Self {
        Self {
            events: Vec::new(),
            positive_subtotal: 0,
            negative_subtotal: 0,
            total: 0,
            cold_start: true,
        }
    }

    /// Build a day score from per-event deviations.
    ///
    /// `deviations` carries `(target, actual)` minute pairs in event order.
    pub fn from_deviations(
        strategy: ScoringStrategy,
        policy: &MultiplierPolicy,
        deviations: &[(f64, f64)],
    ) -> Self {
        let mut events = Vec::with_capacity(deviations.len());
        let mut positive = 0i64;
        let mut negative = 0i64;
        for (index, &(target, actual)) in deviations.iter().enumerate() {
            let diff = actual - target;
            let points = event_points(strategy, diff, policy);
            if points > 0 {
                positive += points;
            } else {
                negative += points;
            }
            events.push(EventScore {
                index,
                target_minutes: target,
                actual_minutes: actual,
                diff_minutes: diff,
                zone_multiplier: zone_multiplier(diff),
                points,
            });
        }
        Self {
            events,
            positive_subtotal: positive,
            negative_subtotal: negative,
            total: positive + negative,
            cold_start: false,
        }
    }

    /// Day total with a shield applied: the negative subtotal is zeroed,
    /// the positive subtotal survives.
    pub fn shielded_total(&self) -> i64 {
        self.positive_subtotal
    }
}
