//! # Taper Core Library
//!
//! Core scoring and progression logic for the Taper cigarette-reduction
//! tracker. It implements a CLI-first philosophy where all operations are
//! available via a standalone CLI binary; any GUI is a thin layer over the
//! same core library.
//!
//! ## Architecture
//!
//! - **Engine**: the orchestrator tying event intake, target prediction,
//!   scoring and progression together behind per-user serialization
//! - **Predictor**: smoothed spacing targets from a 7-day rolling window
//! - **Scoring**: zone-multiplier deviation scoring with a legacy step
//!   function kept for older accounts
//! - **Storage**: SQLite-backed event and state stores behind trait seams,
//!   with an in-memory twin for tests
//!
//! ## Key Components
//!
//! - [`Engine`]: orchestrator over any [`EventStore`] + [`StateStore`]
//! - [`TargetPredictor`]: per-event target minutes from history
//! - [`SqliteStore`]: durable storage with versioned migrations
//! - [`UserSettings`]: typed per-user configuration

pub mod engine;
pub mod error;
pub mod event;
pub mod goal;
pub mod interval;
pub mod maintenance;
pub mod predictor;
pub mod rank;
pub mod records;
pub mod scoring;
pub mod settings;
pub mod shield;
pub mod store;
pub mod streak;

pub use engine::{
    BadgeMetrics, DeleteOutcome, Engine, LogOutcome, ProgressionSummary, RecomputeSummary,
};
pub use error::{CoreError, MaintenanceError, Result, ShieldError, StoreError, ValidationError};
pub use event::{SmokeEvent, WakeEvent};
pub use predictor::{HistoryWindow, TargetPredictor};
pub use rank::{RankTier, RankTransition, TransitionDirection, RANK_TABLE};
pub use records::{DailyScoreRecord, ProgressionState, TemporaryBonus, UnlockedBadge};
pub use scoring::{DayScore, EventScore, MultiplierPolicy, ScoringStrategy};
pub use settings::UserSettings;
pub use shield::ShieldReceipt;
pub use store::{EventStore, MemoryStore, SqliteStore, StateStore};
pub use streak::StreakInfo;
