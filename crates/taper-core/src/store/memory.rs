//! In-memory store backend.
//!
//! Backs tests and property fixtures; interior mutability via a single
//! mutex so the same instance can serve the engine's shared reference.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::event::{SmokeEvent, WakeEvent};
use crate::records::{DailyScoreRecord, ProgressionState, TemporaryBonus, UnlockedBadge};
use crate::settings::UserSettings;

use super::{EventStore, StateStore};

#[derive(Default)]
struct Inner {
    // (owner, date) -> sorted events
    events: BTreeMap<(String, NaiveDate), Vec<SmokeEvent>>,
    wakes: BTreeMap<(String, NaiveDate), WakeEvent>,
    progression: BTreeMap<String, ProgressionState>,
    records: BTreeMap<(String, NaiveDate), DailyScoreRecord>,
    bonuses: Vec<TemporaryBonus>,
    badges: Vec<UnlockedBadge>,
    settings: BTreeMap<String, UserSettings>,
}

/// In-memory implementation of both store traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventStore for MemoryStore {
    fn insert_event(&self, event: &SmokeEvent) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let day = inner
            .events
            .entry((event.owner.clone(), event.date()))
            .or_default();
        day.push(event.clone());
        day.sort_by_key(|e| e.smoked_at);
        Ok(())
    }

    fn delete_event(
        &self,
        owner: &str,
        event_id: &str,
    ) -> Result<Option<SmokeEvent>, StoreError> {
        let mut inner = self.lock();
        for ((o, _), day) in inner.events.iter_mut() {
            if o != owner {
                continue;
            }
            if let Some(pos) = day.iter().position(|e| e.id == event_id) {
                return Ok(Some(day.remove(pos)));
            }
        }
        Ok(None)
    }

    fn events_by_date(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Vec<SmokeEvent>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .events
            .get(&(owner.to_string(), date))
            .cloned()
            .unwrap_or_default())
    }

    fn events_by_range(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, Vec<SmokeEvent>>, StoreError> {
        let inner = self.lock();
        let mut out = BTreeMap::new();
        for ((o, date), day) in inner.events.iter() {
            if o == owner && *date >= start && *date <= end && !day.is_empty() {
                out.insert(*date, day.clone());
            }
        }
        Ok(out)
    }

    fn upsert_wake(&self, wake: &WakeEvent) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .wakes
            .insert((wake.owner.clone(), wake.date), wake.clone());
        Ok(())
    }

    fn wake_by_date(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Option<WakeEvent>, StoreError> {
        let inner = self.lock();
        Ok(inner.wakes.get(&(owner.to_string(), date)).cloned())
    }

    fn wake_by_range(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, WakeEvent>, StoreError> {
        let inner = self.lock();
        let mut out = BTreeMap::new();
        for ((o, date), wake) in inner.wakes.iter() {
            if o == owner && *date >= start && *date <= end {
                out.insert(*date, wake.clone());
            }
        }
        Ok(out)
    }

    fn count_by_date(&self, owner: &str, date: NaiveDate) -> Result<u32, StoreError> {
        let inner = self.lock();
        Ok(inner
            .events
            .get(&(owner.to_string(), date))
            .map(|d| d.len() as u32)
            .unwrap_or(0))
    }

    fn first_event_date(&self, owner: &str) -> Result<Option<NaiveDate>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .events
            .iter()
            .filter(|((o, _), day)| o == owner && !day.is_empty())
            .map(|((_, date), _)| *date)
            .min())
    }

    fn total_count(&self, owner: &str) -> Result<u64, StoreError> {
        let inner = self.lock();
        Ok(inner
            .events
            .iter()
            .filter(|((o, _), _)| o == owner)
            .map(|(_, day)| day.len() as u64)
            .sum())
    }

    fn total_count_until(&self, owner: &str, before: NaiveDate) -> Result<u64, StoreError> {
        let inner = self.lock();
        Ok(inner
            .events
            .iter()
            .filter(|((o, d), _)| o == owner && *d < before)
            .map(|(_, day)| day.len() as u64)
            .sum())
    }

    fn average_daily_count(
        &self,
        owner: &str,
        window_days: u32,
        today: NaiveDate,
    ) -> Result<Option<f64>, StoreError> {
        let inner = self.lock();
        let start = today - chrono::Duration::days(window_days as i64);
        let counts: Vec<u32> = inner
            .events
            .iter()
            .filter(|((o, d), day)| o == owner && *d >= start && *d < today && !day.is_empty())
            .map(|(_, day)| day.len() as u32)
            .collect();
        if counts.is_empty() {
            return Ok(None);
        }
        let total: u32 = counts.iter().sum();
        Ok(Some(total as f64 / counts.len() as f64))
    }
}

impl StateStore for MemoryStore {
    fn progression(&self, owner: &str) -> Result<Option<ProgressionState>, StoreError> {
        let inner = self.lock();
        Ok(inner.progression.get(owner).cloned())
    }

    fn put_progression(&self, state: &ProgressionState) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(existing) = inner.progression.get(&state.owner) {
            if existing.version != state.version {
                return Err(StoreError::Conflict(format!(
                    "progression state for {}",
                    state.owner
                )));
            }
        }
        let mut stored = state.clone();
        stored.version += 1;
        inner.progression.insert(state.owner.clone(), stored);
        Ok(())
    }

    fn daily_record(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyScoreRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner.records.get(&(owner.to_string(), date)).cloned())
    }

    fn latest_daily_record(
        &self,
        owner: &str,
    ) -> Result<Option<DailyScoreRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .records
            .iter()
            .filter(|((o, _), _)| o == owner)
            .map(|(_, r)| r.clone())
            .max_by_key(|r| r.date))
    }

    fn latest_record_before(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyScoreRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .records
            .iter()
            .filter(|((o, d), _)| o == owner && *d < date)
            .map(|(_, r)| r.clone())
            .max_by_key(|r| r.date))
    }

    fn upsert_daily_record(&self, record: &DailyScoreRecord) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .records
            .insert((record.owner.clone(), record.date), record.clone());
        Ok(())
    }

    fn daily_records_range(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyScoreRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .records
            .iter()
            .filter(|((o, d), _)| o == owner && *d >= start && *d <= end)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn insert_bonus(&self, bonus: &TemporaryBonus) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.bonuses.push(bonus.clone());
        Ok(())
    }

    fn active_bonuses(
        &self,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<TemporaryBonus>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .bonuses
            .iter()
            .filter(|b| b.owner == owner && b.is_active(now))
            .cloned()
            .collect())
    }

    fn insert_badge(&self, badge: &UnlockedBadge) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if inner
            .badges
            .iter()
            .any(|b| b.owner == badge.owner && b.badge_code == badge.badge_code)
        {
            return Ok(false);
        }
        inner.badges.push(badge.clone());
        Ok(true)
    }

    fn settings(&self, owner: &str) -> Result<UserSettings, StoreError> {
        let inner = self.lock();
        Ok(inner.settings.get(owner).cloned().unwrap_or_default())
    }

    fn put_settings(&self, owner: &str, settings: &UserSettings) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.settings.insert(owner.to_string(), settings.clone());
        Ok(())
    }
}
