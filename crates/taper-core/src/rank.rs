//! Rank engine: cumulative score to named tier.
//!
//! The threshold table is static and sorted; rank is a pure function of the
//! total score with inclusive boundaries. Each tier contributes a multiplier
//! bonus that accumulates across every tier at or below the current score.

use serde::{Deserialize, Serialize};

/// Total score gating the monthly bonus shield (the top tier's threshold).
pub const MONTHLY_SHIELD_THRESHOLD: u64 = 200_000;

/// One row of the static rank table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankTier {
    /// Inclusive score threshold
    pub threshold: u64,
    /// Tier name
    pub name: &'static str,
    /// Multiplier bonus contributed by this tier
    pub multiplier_bonus: f64,
    /// Feature advantages unlocked at this tier
    pub advantages: &'static [&'static str],
}

/// Ordered, immutable rank table.
pub const RANK_TABLE: &[RankTier] = &[
    RankTier {
        threshold: 0,
        name: "Ember",
        multiplier_bonus: 0.0,
        advantages: &[],
    },
    RankTier {
        threshold: 1_000,
        name: "Spark",
        multiplier_bonus: 0.01,
        advantages: &["weekly_recap"],
    },
    RankTier {
        threshold: 5_000,
        name: "Breather",
        multiplier_bonus: 0.02,
        advantages: &["maintenance_day"],
    },
    RankTier {
        threshold: 15_000,
        name: "Pacer",
        multiplier_bonus: 0.03,
        advantages: &["custom_goal"],
    },
    RankTier {
        threshold: 40_000,
        name: "Strider",
        multiplier_bonus: 0.04,
        advantages: &["extra_shield_slot"],
    },
    RankTier {
        threshold: 90_000,
        name: "Freerunner",
        multiplier_bonus: 0.05,
        advantages: &["extended_stats"],
    },
    RankTier {
        threshold: MONTHLY_SHIELD_THRESHOLD,
        name: "Summit",
        multiplier_bonus: 0.05,
        advantages: &["monthly_shield"],
    },
];

/// Highest tier whose threshold is <= `score` (inclusive boundary).
pub fn rank_for(score: u64) -> &'static RankTier {
    RANK_TABLE
        .iter()
        .rev()
        .find(|tier| tier.threshold <= score)
        .unwrap_or(&RANK_TABLE[0])
}

/// The next tier above `score`, if any.
pub fn next_rank(score: u64) -> Option<&'static RankTier> {
    RANK_TABLE.iter().find(|tier| tier.threshold > score)
}

/// Linear progress toward the next tier, in percent; 100.0 at the top tier.
pub fn progress_percent(score: u64) -> f64 {
    let current = rank_for(score);
    let Some(next) = next_rank(score) else {
        return 100.0;
    };
    let span = (next.threshold - current.threshold) as f64;
    let into = (score - current.threshold) as f64;
    (into / span * 100.0).clamp(0.0, 100.0)
}

/// Sum of multiplier bonuses over every tier at or below `score`.
pub fn cumulative_multiplier(score: u64) -> f64 {
    RANK_TABLE
        .iter()
        .take_while(|tier| tier.threshold <= score)
        .map(|tier| tier.multiplier_bonus)
        .sum()
}

/// Direction of a rank change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionDirection {
    Up,
    Down,
}

/// A detected rank change between two scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankTransition {
    /// Up or down
    pub direction: TransitionDirection,
    /// Tier name before
    pub from: &'static str,
    /// Tier name after
    pub to: &'static str,
    /// Advantages newly exposed by an upward transition (empty when moving
    /// down)
    pub unlocked_advantages: Vec<&'static str>,
}

/// Compare ranks before and after a score change; `None` when the tier name
/// is unchanged.
pub fn detect_transition(prev_score: u64, new_score: u64) -> Option<RankTransition> {
    let before = rank_for(prev_score);
    let after = rank_for(new_score);
    if before.name == after.name {
        return None;
    }
    let direction = if after.threshold > before.threshold {
        TransitionDirection::Up
    } else {
        TransitionDirection::Down
    };
    let unlocked_advantages = match direction {
        TransitionDirection::Up => RANK_TABLE
            .iter()
            .filter(|tier| tier.threshold > before.threshold && tier.threshold <= after.threshold)
            .flat_map(|tier| tier.advantages.iter().copied())
            .collect(),
        TransitionDirection::Down => Vec::new(),
    };
    Some(RankTransition {
        direction,
        from: before.name,
        to: after.name,
        unlocked_advantages,
    })
}
