//! Target predictor: smoothed spacing history and per-event target minutes.
//!
//! Predictions run on a rolling window of the 7 calendar days preceding the
//! scored day. The window is loaded once per (owner, day) through a single
//! range query and cached by the engine; smoothing excludes days that cannot
//! produce a usable figure rather than averaging zeros in.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::event::{SmokeEvent, WakeEvent};
use crate::store::EventStore;

/// Days of history feeding the smoothing window.
pub const HISTORY_DAYS: i64 = 7;

/// Fallback spacing when no window day yields a usable interval.
pub const DEFAULT_INTERVAL_MINUTES: f64 = 60.0;

/// Fallback wake-to-first-event offset.
pub const DEFAULT_FIRST_OFFSET_MINUTES: f64 = 30.0;

/// One prior day's raw material.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaySample {
    /// The day's events, sorted by timestamp
    pub events: Vec<SmokeEvent>,
    /// The day's wake entry, when recorded
    pub wake: Option<WakeEvent>,
}

/// The 7 prior calendar days of one (owner, day), loaded in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryWindow {
    /// The day being scored (not part of the window itself)
    pub day: NaiveDate,
    /// Prior days keyed by date; quiet days are absent
    pub days: BTreeMap<NaiveDate, DaySample>,
}

impl HistoryWindow {
    /// Load the window for `day` from the store: events and wake entries for
    /// the `HISTORY_DAYS` calendar days strictly before `day`.
    pub fn load<S: EventStore + ?Sized>(
        store: &S,
        owner: &str,
        day: NaiveDate,
    ) -> Result<Self, StoreError> {
        let start = day - Duration::days(HISTORY_DAYS);
        let end = day - Duration::days(1);
        let mut days: BTreeMap<NaiveDate, DaySample> = BTreeMap::new();
        for (date, events) in store.events_by_range(owner, start, end)? {
            days.entry(date).or_default().events = events;
        }
        for (date, wake) in store.wake_by_range(owner, start, end)? {
            days.entry(date).or_default().wake = Some(wake);
        }
        Ok(Self { day, days })
    }

    /// True when not a single prior-window day has events.
    pub fn is_empty(&self) -> bool {
        self.days.values().all(|d| d.events.is_empty())
    }
}

/// Mean spacing between a day's consecutive events in minutes;
/// 0.0 when fewer than two events exist (no usable interval).
pub fn day_average_interval(events: &[SmokeEvent]) -> f64 {
    if events.len() < 2 {
        return 0.0;
    }
    let first = events[0].minute_of_day();
    let last = events[events.len() - 1].minute_of_day();
    (last - first) as f64 / (events.len() - 1) as f64
}

/// Prediction queries over one loaded window.
#[derive(Debug, Clone, Copy)]
pub struct TargetPredictor<'a> {
    window: &'a HistoryWindow,
}

impl<'a> TargetPredictor<'a> {
    /// Wrap a loaded window.
    pub fn new(window: &'a HistoryWindow) -> Self {
        Self { window }
    }

    /// Mean of the per-day average interval over the window, excluding days
    /// without a usable interval. Defaults to [`DEFAULT_INTERVAL_MINUTES`].
    pub fn smoothed_interval(&self) -> f64 {
        let intervals: Vec<f64> = self
            .window
            .days
            .values()
            .map(|d| day_average_interval(&d.events))
            .filter(|&i| i > 0.0)
            .collect();
        if intervals.is_empty() {
            return DEFAULT_INTERVAL_MINUTES;
        }
        intervals.iter().sum::<f64>() / intervals.len() as f64
    }

    /// Mean wake-to-first-event offset over window days having both a wake
    /// entry and at least one event. Defaults to
    /// [`DEFAULT_FIRST_OFFSET_MINUTES`].
    pub fn smoothed_first_offset(&self) -> f64 {
        let offsets: Vec<f64> = self
            .window
            .days
            .values()
            .filter_map(|d| {
                let wake = d.wake.as_ref()?;
                let first = d.events.first()?;
                Some(first.minutes_since_wake(wake) as f64)
            })
            .collect();
        if offsets.is_empty() {
            return DEFAULT_FIRST_OFFSET_MINUTES;
        }
        offsets.iter().sum::<f64>() / offsets.len() as f64
    }

    /// Predicted minutes-since-wake for the event at `index` among today's
    /// events so far. Index 0 is anchored on the smoothed first offset; later
    /// indices trail the previous actual event by the smoothed interval.
    pub fn target_minutes(
        &self,
        index: usize,
        today_so_far: &[SmokeEvent],
        wake: Option<&WakeEvent>,
    ) -> f64 {
        if index == 0 {
            return self.smoothed_first_offset();
        }
        let previous = &today_so_far[index - 1];
        let previous_minutes = match wake {
            Some(w) => previous.minutes_since_wake(w) as f64,
            // No wake entry: anchor the axis on the smoothed offset before
            // the day's first event, so the first event sits on target and
            // later events are judged purely on spacing.
            None => {
                let first = today_so_far[0].minute_of_day();
                (previous.minute_of_day() - first) as f64 + self.smoothed_first_offset()
            }
        };
        previous_minutes + self.smoothed_interval()
    }

    /// Actual minutes-since-wake for an event, using the same no-wake
    /// fallback axis as [`Self::target_minutes`].
    pub fn actual_minutes(
        &self,
        event: &SmokeEvent,
        today_so_far: &[SmokeEvent],
        wake: Option<&WakeEvent>,
    ) -> f64 {
        match wake {
            Some(w) => event.minutes_since_wake(w) as f64,
            None => {
                let first = today_so_far
                    .first()
                    .map(|e| e.minute_of_day())
                    .unwrap_or_else(|| event.minute_of_day());
                (event.minute_of_day() - first) as f64 + self.smoothed_first_offset()
            }
        }
    }
}
