//! # danlearn-core
//!
//! The learner state machine for Danlearn - THE LOGIC.
//!
//! This crate owns every rule about a learner's record: the four-step
//! placement diagnostic, daily voice and text quotas with calendar-day
//! rollover, and subscription plans that set the voice allowance.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is pure and synchronous: no async, no network dependencies
//! - Never reads the wall clock; time comes from an injected [`Clock`]
//! - Never scores answers itself; the caller passes the evaluated score in
//! - Uses integer scores so placement is exact at the thresholds

// =============================================================================
// MODULES
// =============================================================================

pub mod assessment;
pub mod clock;
pub mod diagnostic;
pub mod formats;
pub mod primitives;
pub mod state;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Confidence, DanlearnError, LanguageMode, LearningMode, Level, Plan, Score, UiLanguage, UserId,
};

// =============================================================================
// RE-EXPORTS: State Machine
// =============================================================================

pub use assessment::LevelAssessor;
pub use clock::{Clock, ManualClock, SystemClock};
pub use diagnostic::{
    DIAGNOSTIC_TASKS, DiagnosticResult, DiagnosticTask, TurnOutcome, TurnPlan, complete_turn,
    finished_report, plan_turn, task_for_step,
};
pub use state::{
    Accounting, AnswerMeta, DailyUsage, DiagnosticState, ExamRecord, SessionInfo, Subscription,
    TextUsage, UserState, VoiceUsage,
};

// =============================================================================
// RE-EXPORTS: Storage & Formats
// =============================================================================

pub use formats::{SnapshotHeader, snapshot_from_bytes, snapshot_to_bytes};
pub use storage::{MemoryStore, RedbStore, StorageBackend, UserStore};
