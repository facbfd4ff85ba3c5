//! Orchestrator: wires predictor, scoring, rank, streak, goal, interval,
//! maintenance and shield logic together over the store seam.
//!
//! The engine owns the historical-window cache and its invalidation, and
//! serializes all per-user mutations behind a per-user lock so the
//! single-row counters in `ProgressionState` and `DailyScoreRecord` cannot
//! lose updates to concurrent writers on the same account.
//!
//! Every mutation keeps the day's `DailyScoreRecord` and the progression
//! totals in step: the record is the durable cache the fast-path reads come
//! from, the progression row is adjusted by the day's score delta.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, StoreError};
use crate::event::{SmokeEvent, WakeEvent};
use crate::goal::{self, GoalEvaluation};
use crate::interval;
use crate::maintenance;
use crate::predictor::{day_average_interval, HistoryWindow, TargetPredictor, HISTORY_DAYS};
use crate::rank::{self, RankTransition};
use crate::records::{BonusKind, DailyScoreRecord, ProgressionState};
use crate::scoring::{DayScore, MultiplierPolicy, ScoringStrategy};
use crate::shield::{self, ShieldReceipt};
use crate::store::{EventStore, StateStore};
use crate::streak::{self, StreakInfo};

/// Derived metrics handed to the external badge evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadgeMetrics {
    /// Consecutive positive days ending today
    pub current_streak: u32,
    /// Longest run ever
    pub best_streak: u32,
    /// Estimated money saved against the first-week baseline
    pub money_saved: f64,
    /// Percent reduction of the trailing daily count vs the baseline
    pub reduction_percent: f64,
}

/// Response of [`Engine::log_event`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogOutcome {
    /// Id of the stored event
    pub event_id: String,
    /// Points the new event contributed
    pub event_points: i64,
    /// The day's aggregated score after the mutation
    pub day_score: i64,
    /// Events logged today, including this one
    pub today_count: u32,
    /// Streak counters after the mutation
    pub streak: StreakInfo,
    /// Rank change triggered by the score delta, if any
    pub rank_transition: Option<RankTransition>,
    /// Metrics for the badge evaluator
    pub metrics: BadgeMetrics,
}

/// Response of [`Engine::delete_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Events remaining on the affected day
    pub today_count: u32,
}

/// Read-model returned by [`Engine::progression_summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionSummary {
    /// Current rank name
    pub rank: &'static str,
    /// Progress toward the next rank, in percent
    pub rank_progress_percent: f64,
    /// Cumulative score
    pub total_score: u64,
    /// Streak counters (fast path)
    pub streak: StreakInfo,
    /// Daily goal tier in force
    pub goal_tier: u32,
    /// Next goal milestone, when one exists
    pub next_goal_tier: Option<u32>,
    /// Shields on hand
    pub shields: u32,
    /// Target spacing interval in minutes, once established
    pub target_interval: Option<f64>,
    /// Progression constants in force
    pub interval_policy: interval::IntervalPolicy,
    /// Metrics for the badge evaluator
    pub metrics: BadgeMetrics,
}

/// Response of [`Engine::recompute_history`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeSummary {
    /// First day rebuilt
    pub from: NaiveDate,
    /// Last day rebuilt
    pub to: NaiveDate,
    /// Days that produced or refreshed a record
    pub days_rebuilt: u32,
}

/// Explicit per-(owner, day) cache of historical windows.
///
/// Owned by the engine, never module state; every write that can touch a
/// window's range must invalidate the affected keys.
#[derive(Default)]
struct WindowCache {
    map: Mutex<HashMap<(String, NaiveDate), Arc<HistoryWindow>>>,
}

impl WindowCache {
    fn get_or_load<S: EventStore>(
        &self,
        store: &S,
        owner: &str,
        day: NaiveDate,
    ) -> Result<Arc<HistoryWindow>, StoreError> {
        let key = (owner.to_string(), day);
        if let Some(window) = self.map.lock().unwrap().get(&key) {
            return Ok(Arc::clone(window));
        }
        let window = Arc::new(HistoryWindow::load(store, owner, day)?);
        self.map
            .lock()
            .unwrap()
            .insert(key, Arc::clone(&window));
        Ok(window)
    }

    /// Drop every window whose range can contain `date`: the windows of the
    /// following `HISTORY_DAYS` days.
    fn invalidate(&self, owner: &str, date: NaiveDate) {
        let mut map = self.map.lock().unwrap();
        for offset in 1..=HISTORY_DAYS {
            map.remove(&(owner.to_string(), date + Duration::days(offset)));
        }
    }

    /// Drop one day's window once a streaming pass has moved past it.
    fn evict(&self, owner: &str, day: NaiveDate) {
        self.map.lock().unwrap().remove(&(owner.to_string(), day));
    }
}

/// The scoring and progression engine.
pub struct Engine<S: EventStore + StateStore> {
    store: S,
    strategy: ScoringStrategy,
    windows: WindowCache,
    // One entry per owner for the engine's lifetime; bounded by the number
    // of accounts this process serves.
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: EventStore + StateStore> Engine<S> {
    /// Create an engine over a store with the canonical scoring strategy.
    pub fn new(store: S) -> Self {
        Self::with_strategy(store, ScoringStrategy::default())
    }

    /// Create an engine with an explicit scoring strategy, e.g. for
    /// accounts still on the legacy step function.
    pub fn with_strategy(store: S, strategy: ScoringStrategy) -> Self {
        Self {
            store,
            strategy,
            windows: WindowCache::default(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn user_lock(&self, owner: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap();
        Arc::clone(locks.entry(owner.to_string()).or_default())
    }

    fn progression_or_new(&self, owner: &str) -> Result<ProgressionState, StoreError> {
        Ok(self
            .store
            .progression(owner)?
            .unwrap_or_else(|| ProgressionState::new(owner)))
    }

    /// Log a smoke event and refresh every aggregate it touches.
    pub fn log_event(
        &self,
        owner: &str,
        smoked_at: DateTime<Utc>,
        retroactive: bool,
        now: DateTime<Utc>,
    ) -> Result<LogOutcome> {
        let event = SmokeEvent::new(owner, smoked_at, retroactive, now)?;
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();

        self.store.insert_event(&event)?;
        self.windows.invalidate(owner, event.date());

        let rebuild = self.rescore_from(owner, event.date(), now);
        let (day_score, streak, rank_transition) = match rebuild {
            Ok(result) => result,
            Err(err) => {
                // The event write must not survive a failed aggregate
                // update; compensate before propagating.
                let _ = self.store.delete_event(owner, &event.id);
                return Err(err);
            }
        };

        // A retroactive log can land anywhere in the day's ordering; find
        // the stored event's position before reading its score.
        let events_today = self.store.events_by_date(owner, event.date())?;
        let event_points = events_today
            .iter()
            .position(|e| e.id == event.id)
            .and_then(|i| day_score.events.get(i))
            .map(|e| e.points)
            .unwrap_or(0);
        let today_count = events_today.len() as u32;
        let metrics = self.badge_metrics(owner, now.date_naive())?;

        Ok(LogOutcome {
            event_id: event.id,
            event_points,
            day_score: if day_score.cold_start {
                0
            } else {
                day_score.total
            },
            today_count,
            streak,
            rank_transition,
            metrics,
        })
    }

    /// Record (or replace) the wake time for a day and refresh the scores
    /// it anchors.
    pub fn record_wake(
        &self,
        owner: &str,
        date: NaiveDate,
        wake_time: NaiveTime,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();
        self.store
            .upsert_wake(&WakeEvent::new(owner, date, wake_time))?;
        self.windows.invalidate(owner, date);
        self.rescore_from(owner, date, now)?;
        Ok(())
    }

    /// Delete an event and refresh every aggregate it touched.
    pub fn delete_event(
        &self,
        owner: &str,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DeleteOutcome> {
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();

        let Some(event) = self.store.delete_event(owner, event_id)? else {
            return Err(StoreError::NotFound(format!("event {event_id}")).into());
        };
        self.windows.invalidate(owner, event.date());
        self.rescore_from(owner, event.date(), now)?;

        Ok(DeleteOutcome {
            today_count: self.store.count_by_date(owner, event.date())?,
        })
    }

    /// The daily record for a date, computing and persisting it when stale
    /// or absent.
    pub fn daily_score(
        &self,
        owner: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DailyScoreRecord> {
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();
        let mut state = self.progression_or_new(owner)?;
        let record = self.rescore_day(owner, date, &mut state, now)?;
        self.store.put_progression(&state)?;
        Ok(record)
    }

    /// Aggregated progression view for the caller.
    pub fn progression_summary(&self, owner: &str, now: DateTime<Utc>) -> Result<ProgressionSummary> {
        let today = now.date_naive();
        let state = self.progression_or_new(owner)?;
        let mut settings = self.store.settings(owner)?;
        let goal: GoalEvaluation = goal::evaluate(&self.store, &mut settings, owner, today)?;
        if goal.tier_changed || goal.achieved {
            self.store.put_settings(owner, &settings)?;
        }
        let streak = streak::fast_path(self.store.latest_daily_record(owner)?.as_ref(), today);
        let tier = rank::rank_for(state.total_score);
        Ok(ProgressionSummary {
            rank: tier.name,
            rank_progress_percent: rank::progress_percent(state.total_score),
            total_score: state.total_score,
            streak,
            goal_tier: goal.current_tier,
            next_goal_tier: goal.next_tier,
            shields: state.shields_count,
            target_interval: state.current_target_interval,
            interval_policy: interval::IntervalPolicy::default(),
            metrics: self.badge_metrics(owner, today)?,
        })
    }

    /// Consume a shield for today.
    pub fn use_shield(&self, owner: &str, now: DateTime<Utc>) -> Result<ShieldReceipt> {
        let today = now.date_naive();
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();

        let mut state = self.progression_or_new(owner)?;
        let mut record = self.rescore_day(owner, today, &mut state, now)?;
        let day_score = self.score_day(owner, today, &state, now)?;
        let mut settings = self.store.settings(owner)?;

        // Nothing left to recover once the day is already shielded.
        let negative_subtotal = if record.shield_applied {
            0
        } else {
            day_score.negative_subtotal
        };
        let receipt = shield::use_shield(&mut state, &mut settings, &mut record, negative_subtotal)?;
        state.apply_score_delta(receipt.points_recovered);

        let counters =
            streak::counters_for_day(&self.store, owner, today, record.streak_positive(), false)?;
        record.streak = counters.current;
        record.best_streak = counters.best;

        self.store.upsert_daily_record(&record)?;
        self.store.put_settings(owner, &settings)?;
        self.store.put_progression(&state)?;
        Ok(receipt)
    }

    /// Claim the monthly bonus shield.
    pub fn claim_monthly_shield(&self, owner: &str, now: DateTime<Utc>) -> Result<u32> {
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();
        let mut state = self.progression_or_new(owner)?;
        let mut settings = self.store.settings(owner)?;
        let count = shield::claim_monthly_shield(&mut state, &mut settings, now.date_naive())?;
        self.store.put_settings(owner, &settings)?;
        self.store.put_progression(&state)?;
        Ok(count)
    }

    /// Activate a maintenance day (defaults to today at the call site).
    pub fn activate_maintenance_day(
        &self,
        owner: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DailyScoreRecord> {
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();

        let mut record = maintenance::activate(&self.store, owner, date, now)?;
        let counters = streak::counters_for_day(&self.store, owner, date, false, true)?;
        record.streak = counters.current;
        record.best_streak = counters.best;
        self.store.upsert_daily_record(&record)?;
        Ok(record)
    }

    /// Clear the maintenance flag and rescore the day normally.
    pub fn deactivate_maintenance_day(
        &self,
        owner: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DailyScoreRecord> {
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();

        let record = maintenance::deactivate(&self.store, owner, date, now)?;
        self.store.upsert_daily_record(&record)?;
        let mut state = self.progression_or_new(owner)?;
        let refreshed = self.rescore_day(owner, date, &mut state, now)?;
        self.store.put_progression(&state)?;
        Ok(refreshed)
    }

    /// Whether a maintenance activation is still available this ISO week.
    pub fn maintenance_available(&self, owner: &str, date: NaiveDate) -> Result<bool> {
        Ok(maintenance::is_available(&self.store, owner, date)?)
    }

    /// Idempotent rebuild of daily records and streak counters over a range,
    /// streaming day by day.
    pub fn recompute_history(
        &self,
        owner: &str,
        since: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<RecomputeSummary> {
        let today = now.date_naive();
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();

        let first = self.store.first_event_date(owner)?;
        let from = match (since, first) {
            (Some(since), Some(first)) => since.max(first),
            (None, Some(first)) => first,
            // Nothing to rebuild without any event.
            (_, None) => {
                return Ok(RecomputeSummary {
                    from: today,
                    to: today,
                    days_rebuilt: 0,
                })
            }
        };

        let mut state = self.progression_or_new(owner)?;
        let mut days_rebuilt = 0u32;
        let mut day = from;
        while day <= today {
            let has_events = self.store.count_by_date(owner, day)? > 0;
            let has_record = self.store.daily_record(owner, day)?.is_some();
            if has_events || has_record {
                self.rescore_day(owner, day, &mut state, now)?;
                days_rebuilt += 1;
                // The cursor only moves forward; this day's window is done.
                self.windows.evict(owner, day);
            }
            day += Duration::days(1);
        }
        self.store.put_progression(&state)?;

        Ok(RecomputeSummary {
            from,
            to: today,
            days_rebuilt,
        })
    }

    /// Authoritative streak recompute: scan every day from the first event
    /// through today. Must agree with the fast path on any dataset.
    pub fn authoritative_streak(&self, owner: &str, now: DateTime<Utc>) -> Result<StreakInfo> {
        let today = now.date_naive();
        let Some(first) = self.store.first_event_date(owner)? else {
            return Ok(StreakInfo::default());
        };
        let mut scan = streak::StreakScan::new();
        let mut day = first;
        while day <= today {
            let record = self.store.daily_record(owner, day)?;
            match record {
                Some(record) => scan.observe(record.streak_positive(), record.is_maintenance_day),
                None => scan.observe(false, false),
            }
            day += Duration::days(1);
        }
        Ok(scan.info())
    }

    // === Internals ===

    /// True when the user has no event history before `day` — the cold
    /// start case, where the day is non-scorable by definition.
    fn is_cold_start(&self, owner: &str, day: NaiveDate) -> Result<bool, StoreError> {
        Ok(self
            .store
            .first_event_date(owner)?
            .map_or(true, |first| first >= day))
    }

    /// Score the day's events against their targets without persisting.
    fn score_day(
        &self,
        owner: &str,
        day: NaiveDate,
        state: &ProgressionState,
        now: DateTime<Utc>,
    ) -> Result<DayScore> {
        if self.is_cold_start(owner, day)? {
            return Ok(DayScore::cold_start());
        }
        let window = self.windows.get_or_load(&self.store, owner, day)?;
        let predictor = TargetPredictor::new(&window);
        let events = self.store.events_by_date(owner, day)?;
        let wake = self.store.wake_by_date(owner, day)?;

        let policy = self.multiplier_policy(owner, state, now)?;
        let deviations: Vec<(f64, f64)> = events
            .iter()
            .enumerate()
            .map(|(index, event)| {
                let target = predictor.target_minutes(index, &events, wake.as_ref());
                let actual = predictor.actual_minutes(event, &events, wake.as_ref());
                (target, actual)
            })
            .collect();
        Ok(DayScore::from_deviations(self.strategy, &policy, &deviations))
    }

    fn multiplier_policy(
        &self,
        owner: &str,
        state: &ProgressionState,
        now: DateTime<Utc>,
    ) -> Result<MultiplierPolicy, StoreError> {
        let score_percent_total = self
            .store
            .active_bonuses(owner, now)?
            .iter()
            .filter(|b| b.kind == BonusKind::ScorePercent)
            .map(|b| b.value)
            .sum();
        Ok(MultiplierPolicy {
            rank_bonus: rank::cumulative_multiplier(state.total_score),
            permanent_multiplier: state.permanent_multiplier,
            score_percent_total,
        })
    }

    /// Recompute and persist one day's record, keeping the progression
    /// totals in step. Returns the fresh record.
    fn rescore_day(
        &self,
        owner: &str,
        day: NaiveDate,
        state: &mut ProgressionState,
        now: DateTime<Utc>,
    ) -> Result<DailyScoreRecord> {
        let existing = self.store.daily_record(owner, day)?;
        let is_maintenance = existing
            .as_ref()
            .map(|r| r.is_maintenance_day)
            .unwrap_or(false);
        let shield_applied = existing
            .as_ref()
            .map(|r| r.shield_applied)
            .unwrap_or(false);
        let old_score = existing.as_ref().map(|r| r.score).unwrap_or(0);

        let day_score = self.score_day(owner, day, state, now)?;
        let events = self.store.events_by_date(owner, day)?;
        let avg_interval = match day_average_interval(&events) {
            avg if avg > 0.0 => Some(avg),
            _ => None,
        };

        let target_interval = if day_score.cold_start {
            state.current_target_interval
        } else {
            let window = self.windows.get_or_load(&self.store, owner, day)?;
            let smoothed = TargetPredictor::new(&window).smoothed_interval();
            Some(self.target_interval_for(owner, day, state, smoothed, existing.as_ref())?)
        };

        let score = if shield_applied {
            day_score.shielded_total()
        } else {
            day_score.total
        };
        let policy = self.multiplier_policy(owner, state, now)?;

        let mut record = DailyScoreRecord {
            owner: owner.to_string(),
            date: day,
            score,
            event_count: events.len() as u32,
            streak: 0,
            best_streak: 0,
            avg_interval,
            target_interval,
            is_maintenance_day: is_maintenance,
            shield_applied,
            multiplier_applied: if day_score.cold_start {
                None
            } else {
                Some(1.0 + policy.rank_bonus + policy.permanent_multiplier)
            },
            computed_at: now,
        };

        let counters = streak::counters_for_day(
            &self.store,
            owner,
            day,
            record.streak_positive(),
            is_maintenance,
        )?;
        record.streak = counters.current;
        record.best_streak = counters.best;

        self.store.upsert_daily_record(&record)?;

        state.apply_score_delta(score - old_score);

        Ok(record)
    }

    fn target_interval_for(
        &self,
        owner: &str,
        day: NaiveDate,
        state: &mut ProgressionState,
        smoothed: f64,
        existing: Option<&DailyScoreRecord>,
    ) -> Result<f64, StoreError> {
        if let Some(updated) = state.interval_updated_on {
            if day < updated {
                // Historical re-score: keep the interval recorded for the
                // day, falling back to the previous day's plus the daily
                // increment.
                if let Some(target) = existing.and_then(|r| r.target_interval) {
                    return Ok(target);
                }
                let previous = self
                    .store
                    .daily_record(owner, day - Duration::days(1))?
                    .and_then(|r| r.target_interval);
                return Ok(match previous {
                    Some(previous) => previous + interval::DAILY_INCREMENT,
                    None => interval::first_target(smoothed),
                });
            }
        }
        interval::advance_to(&self.store, state, day, smoothed)
    }

    /// Rescore `date` and any later day whose cached window contained it,
    /// then persist the progression row once. Returns the day's score, the
    /// refreshed streak counters, and any rank transition.
    fn rescore_from(
        &self,
        owner: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(DayScore, StreakInfo, Option<RankTransition>)> {
        let mut state = self.progression_or_new(owner)?;
        let prev_total = state.total_score;

        self.rescore_day(owner, date, &mut state, now)?;
        let day_score = self.score_day(owner, date, &state, now)?;

        // A retroactive write shifts the windows of the following days;
        // refresh any that already hold a record.
        let today = now.date_naive();
        let mut day = date + Duration::days(1);
        let horizon = (date + Duration::days(HISTORY_DAYS)).min(today);
        while day <= horizon {
            if self.store.daily_record(owner, day)?.is_some()
                || self.store.count_by_date(owner, day)? > 0
            {
                self.rescore_day(owner, day, &mut state, now)?;
            }
            day += Duration::days(1);
        }

        // Scores past the horizon are untouched, but streak counters chain
        // day over day; walk them forward until they converge with the
        // stored values.
        while day <= today {
            if let Some(mut record) = self.store.daily_record(owner, day)? {
                let counters = streak::counters_for_day(
                    &self.store,
                    owner,
                    day,
                    record.streak_positive(),
                    record.is_maintenance_day,
                )?;
                if counters.current == record.streak && counters.best == record.best_streak {
                    break;
                }
                record.streak = counters.current;
                record.best_streak = counters.best;
                self.store.upsert_daily_record(&record)?;
            }
            day += Duration::days(1);
        }

        self.store.put_progression(&state)?;
        let streak_info =
            streak::fast_path(self.store.latest_daily_record(owner)?.as_ref(), today);
        let transition = rank::detect_transition(prev_total, state.total_score);
        Ok((day_score, streak_info, transition))
    }

    fn badge_metrics(&self, owner: &str, today: NaiveDate) -> Result<BadgeMetrics, CoreError> {
        let streak = streak::fast_path(self.store.latest_daily_record(owner)?.as_ref(), today);
        let Some(first) = self.store.first_event_date(owner)? else {
            return Ok(BadgeMetrics {
                current_streak: streak.current,
                best_streak: streak.best,
                money_saved: 0.0,
                reduction_percent: 0.0,
            });
        };

        // Baseline: mean daily count over the user's first week.
        let baseline_days = self
            .store
            .events_by_range(owner, first, first + Duration::days(6))?;
        let baseline_total: usize = baseline_days.values().map(|d| d.len()).sum();
        let baseline = baseline_total as f64 / 7.0;

        let settings = self.store.settings(owner)?;
        let days_tracked = (today - first).num_days().max(0) as u32 + 1;
        // Count through the report day only, so retroactive rescoring of an
        // earlier day never inflates that day's metrics.
        let total = self.store.total_count_until(owner, today + Duration::days(1))?;
        let money_saved = settings.savings_estimate(baseline, total, days_tracked);

        let trailing = self
            .store
            .average_daily_count(owner, goal::GOAL_WINDOW_DAYS, today)?
            .unwrap_or(0.0);
        let reduction_percent = if baseline > 0.0 {
            ((baseline - trailing) / baseline * 100.0).max(0.0)
        } else {
            0.0
        };

        Ok(BadgeMetrics {
            current_streak: streak.current,
            best_streak: streak.best,
            money_saved,
            reduction_percent,
        })
    }

    /// Explicit account reset: clears progression state, the stored tier
    /// and the target interval. The only sanctioned way the target interval
    /// may decrease.
    pub fn reset_account(&self, owner: &str, now: DateTime<Utc>) -> Result<()> {
        let lock = self.user_lock(owner);
        let _guard = lock.lock().unwrap();

        let mut state = self.progression_or_new(owner)?;
        let version = state.version;
        state = ProgressionState::new(owner);
        state.version = version;
        interval::reset(&mut state);
        self.store.put_progression(&state)?;

        let mut settings = self.store.settings(owner)?;
        settings.stored_tier = None;
        settings.last_displayed_tier = None;
        settings.last_reset_on = Some(now.date_naive());
        self.store.put_settings(owner, &settings)?;
        Ok(())
    }
}
