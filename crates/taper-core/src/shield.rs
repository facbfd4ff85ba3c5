//! Shield bank: consumable tokens that nullify a day's negative score.
//!
//! Consuming a shield zeroes the negative subtotal of the day's aggregated
//! score without touching any event; the positive subtotal survives and the
//! day keeps the streak alive. A monthly bonus shield is claimable at the
//! top rank, once per calendar month.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ShieldError;
use crate::rank::MONTHLY_SHIELD_THRESHOLD;
use crate::records::{DailyScoreRecord, ProgressionState};
use crate::settings::UserSettings;

/// Result of a successful shield use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldReceipt {
    /// Shields remaining after the use
    pub shields_remaining: u32,
    /// Points recovered by zeroing the negative subtotal
    pub points_recovered: i64,
}

/// Consume one shield for the day behind `record`.
///
/// Mutates `state` (shield count), `settings` (lifetime used counter) and
/// `record` (flag and score); the caller persists all three together.
pub fn use_shield(
    state: &mut ProgressionState,
    settings: &mut UserSettings,
    record: &mut DailyScoreRecord,
    negative_subtotal: i64,
) -> Result<ShieldReceipt, ShieldError> {
    if state.shields_count == 0 {
        return Err(ShieldError::NoShieldAvailable);
    }
    state.shields_count -= 1;
    settings.shields_used += 1;

    let recovered = negative_subtotal.min(0).abs();
    record.shield_applied = true;
    record.score += recovered;

    Ok(ShieldReceipt {
        shields_remaining: state.shields_count,
        points_recovered: recovered,
    })
}

/// Claim the monthly bonus shield.
///
/// Gated on total score reaching the top-tier threshold and on the last
/// claim falling in an earlier calendar month.
pub fn claim_monthly_shield(
    state: &mut ProgressionState,
    settings: &mut UserSettings,
    today: NaiveDate,
) -> Result<u32, ShieldError> {
    if state.total_score < MONTHLY_SHIELD_THRESHOLD {
        return Err(ShieldError::ScoreTooLow {
            score: state.total_score,
            required: MONTHLY_SHIELD_THRESHOLD,
        });
    }
    if let Some(last) = settings.monthly_shield_claimed_on {
        if (last.year(), last.month()) == (today.year(), today.month()) {
            return Err(ShieldError::AlreadyClaimedThisMonth);
        }
    }
    state.shields_count += 1;
    settings.monthly_shield_claimed_on = Some(today);
    Ok(state.shields_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record_with_score(score: i64) -> DailyScoreRecord {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 21, 0, 0).unwrap();
        let mut record =
            DailyScoreRecord::placeholder("u1", NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), now);
        record.score = score;
        record
    }

    #[test]
    fn test_use_shield_with_none_available_fails() {
        let mut state = ProgressionState::new("u1");
        let mut settings = UserSettings::default();
        let mut record = record_with_score(-40);
        let result = use_shield(&mut state, &mut settings, &mut record, -40);
        assert_eq!(result.unwrap_err(), ShieldError::NoShieldAvailable);
        assert_eq!(state.shields_count, 0);
        assert!(!record.shield_applied);
    }

    #[test]
    fn test_use_shield_zeroes_negative_subtotal() {
        let mut state = ProgressionState::new("u1");
        state.shields_count = 2;
        let mut settings = UserSettings::default();
        // Day at -25 overall from +15 positive and -40 negative.
        let mut record = record_with_score(-25);
        let receipt = use_shield(&mut state, &mut settings, &mut record, -40).unwrap();
        assert_eq!(receipt.shields_remaining, 1);
        assert_eq!(receipt.points_recovered, 40);
        assert_eq!(record.score, 15);
        assert!(record.shield_applied);
        assert_eq!(settings.shields_used, 1);
    }

    #[test]
    fn test_use_shield_on_clean_day_recovers_nothing() {
        let mut state = ProgressionState::new("u1");
        state.shields_count = 1;
        let mut settings = UserSettings::default();
        let mut record = record_with_score(30);
        let receipt = use_shield(&mut state, &mut settings, &mut record, 0).unwrap();
        assert_eq!(receipt.points_recovered, 0);
        assert_eq!(record.score, 30);
    }

    #[test]
    fn test_monthly_claim_requires_top_score() {
        let mut state = ProgressionState::new("u1");
        state.total_score = 150_000;
        let mut settings = UserSettings::default();
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(matches!(
            claim_monthly_shield(&mut state, &mut settings, today),
            Err(ShieldError::ScoreTooLow { .. })
        ));
    }

    #[test]
    fn test_monthly_claim_once_per_month() {
        let mut state = ProgressionState::new("u1");
        state.total_score = 250_000;
        let mut settings = UserSettings::default();
        let march = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let late_march = NaiveDate::from_ymd_opt(2025, 3, 28).unwrap();
        let april = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();

        assert_eq!(claim_monthly_shield(&mut state, &mut settings, march), Ok(1));
        assert_eq!(
            claim_monthly_shield(&mut state, &mut settings, late_march),
            Err(ShieldError::AlreadyClaimedThisMonth)
        );
        assert_eq!(claim_monthly_shield(&mut state, &mut settings, april), Ok(2));
    }
}
