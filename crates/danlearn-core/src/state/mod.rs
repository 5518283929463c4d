//! # Learner State
//!
//! The per-learner record ([`UserState`]) and its sub-records.
//!
//! All transitions are methods on `UserState`; the sub-records expose their
//! fields for reading but their mutators are crate-private.

mod diagnostic;
mod subscription;
mod usage;
mod user_state;

pub use diagnostic::DiagnosticState;
pub use subscription::Subscription;
pub use usage::{DailyUsage, TextUsage, VoiceUsage};
pub use user_state::{Accounting, AnswerMeta, ExamRecord, SessionInfo, UserState};
