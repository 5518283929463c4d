//! # UserState
//!
//! The per-learner record and every transition allowed on it.
//!
//! Fields are private; callers read through accessors and mutate through
//! the named operations below, so no caller can observe or produce a record
//! that violates the usage, subscription or diagnostic invariants.
//!
//! ## Persistence
//!
//! The serde representation IS the persisted snapshot: `userId`,
//! `uiLanguage`, `languageMode`, `subscription`, `usage`, `diagnostic`,
//! `exam`. `mode` and `session` are transient and re-default on load.

use super::{DailyUsage, DiagnosticState, Subscription};
use crate::clock::Clock;
use crate::primitives::{MAX_ANSWER_TEXT_LENGTH, SUBSCRIPTION_PERIOD_DAYS};
use crate::{DanlearnError, LanguageMode, LearningMode, Level, Plan, Score, UiLanguage, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SIDE RECORDS
// =============================================================================

/// Exam preparation record. Carried through persistence unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExamRecord {
    pub target: Option<String>,
    pub readiness: BTreeMap<String, serde_json::Value>,
    pub attempts: u32,
}

/// Volatile session data. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionInfo {
    /// Last time an answer was processed in this process.
    pub last_active: Option<DateTime<Utc>>,
}

/// Metadata describing one learner answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnswerMeta {
    /// Free-text answer content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Voice seconds consumed by the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_seconds: Option<u32>,
    /// Score for the answer, when already known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
}

impl AnswerMeta {
    /// Answer text, if any non-blank text is present.
    #[must_use]
    pub fn answer_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Reject oversized payloads before they reach the evaluator.
    pub fn validate(&self) -> Result<(), DanlearnError> {
        if let Some(text) = &self.text
            && text.len() > MAX_ANSWER_TEXT_LENGTH
        {
            return Err(DanlearnError::InvalidAnswer(format!(
                "answer text length {} exceeds maximum {} bytes",
                text.len(),
                MAX_ANSWER_TEXT_LENGTH
            )));
        }
        Ok(())
    }
}

/// Where an answer was accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accounting {
    /// Counted as a diagnostic step; daily usage untouched.
    DiagnosticStep,
    /// Counted against daily usage.
    DailyUsage,
}

// =============================================================================
// USER STATE
// =============================================================================

/// All mutable state of one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    user_id: UserId,
    #[serde(default)]
    ui_language: UiLanguage,
    #[serde(default)]
    language_mode: LanguageMode,
    #[serde(skip)]
    mode: Option<LearningMode>,
    #[serde(default)]
    subscription: Subscription,
    #[serde(default)]
    usage: DailyUsage,
    #[serde(default)]
    diagnostic: DiagnosticState,
    #[serde(default)]
    exam: ExamRecord,
    #[serde(skip)]
    session: SessionInfo,
}

impl UserState {
    /// Create a fresh record with default field values and today's usage.
    #[must_use]
    pub fn new(user_id: UserId, clock: &dyn Clock) -> Self {
        let mut state = Self {
            user_id,
            ui_language: UiLanguage::default(),
            language_mode: LanguageMode::default(),
            mode: None,
            subscription: Subscription::default(),
            usage: DailyUsage::default(),
            diagnostic: DiagnosticState::default(),
            exam: ExamRecord::default(),
            session: SessionInfo {
                last_active: Some(clock.now()),
            },
        };
        state.usage = state.create_fresh_usage(clock);
        state
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn ui_language(&self) -> UiLanguage {
        self.ui_language
    }

    #[must_use]
    pub fn language_mode(&self) -> LanguageMode {
        self.language_mode
    }

    #[must_use]
    pub fn mode(&self) -> Option<&LearningMode> {
        self.mode.as_ref()
    }

    #[must_use]
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Stored usage record, possibly from an earlier day.
    ///
    /// Use [`UserState::usage_for_today`] when the value feeds a decision.
    #[must_use]
    pub fn usage(&self) -> &DailyUsage {
        &self.usage
    }

    #[must_use]
    pub fn diagnostic(&self) -> &DiagnosticState {
        &self.diagnostic
    }

    #[must_use]
    pub fn exam(&self) -> &ExamRecord {
        &self.exam
    }

    #[must_use]
    pub fn session(&self) -> SessionInfo {
        self.session
    }

    // =========================================================================
    // USAGE
    // =========================================================================

    /// A zeroed usage record for today with the plan's voice allowance.
    #[must_use]
    pub fn create_fresh_usage(&self, clock: &dyn Clock) -> DailyUsage {
        DailyUsage::fresh(clock.today(), self.subscription.voice_limit_seconds())
    }

    /// Replace the usage record if it belongs to an earlier (or later) day.
    ///
    /// Returns `true` when a rollover happened. Idempotent within a day and
    /// touches nothing but `usage`.
    pub fn ensure_usage_for_today(&mut self, clock: &dyn Clock) -> bool {
        let today = clock.today();
        if self.usage.date == today {
            return false;
        }
        self.usage = self.create_fresh_usage(clock);
        self.apply_plan_limits();
        true
    }

    /// Today's usage, rolling the record over first if needed.
    pub fn usage_for_today(&mut self, clock: &dyn Clock) -> &DailyUsage {
        self.ensure_usage_for_today(clock);
        &self.usage
    }

    /// Derive the voice allowance from the subscription.
    pub fn apply_plan_limits(&mut self) {
        let limit = self.subscription.voice_limit_seconds();
        self.usage.set_voice_limit(limit);
    }

    /// Account consumed voice seconds against today's allowance.
    pub fn add_voice_seconds(&mut self, seconds: u32, clock: &dyn Clock) {
        self.ensure_usage_for_today(clock);
        self.usage.record_voice(seconds);
    }

    /// Account one text step against today's soft limit.
    pub fn add_text_step(&mut self, clock: &dyn Clock) {
        self.ensure_usage_for_today(clock);
        self.usage.record_text_step();
    }

    // =========================================================================
    // DIAGNOSTIC
    // =========================================================================

    /// Start (or restart) the placement diagnostic from step 0.
    ///
    /// The diagnostic is always presented in English.
    pub fn start_diagnostic(&mut self) {
        self.diagnostic.active = true;
        self.diagnostic.steps_completed = 0;
        self.diagnostic.estimated_level = None;
        self.diagnostic.scores.clear();
        self.ui_language = UiLanguage::En;
    }

    /// Finish the diagnostic with a level. Steps and scores stay for audit.
    pub fn stop_diagnostic(&mut self, level: Level) {
        self.diagnostic.active = false;
        self.diagnostic.estimated_level = Some(level);
    }

    // =========================================================================
    // SUBSCRIPTION
    // =========================================================================

    /// Activate a plan for one subscription period.
    pub fn activate_subscription(&mut self, plan: Plan, clock: &dyn Clock) {
        self.subscription.active = true;
        self.subscription.plan = Some(plan);
        self.subscription.valid_until = Some(clock.now() + Duration::days(SUBSCRIPTION_PERIOD_DAYS));
        self.apply_plan_limits();
    }

    /// Cancel the subscription. Voice already used today is kept.
    pub fn cancel_subscription(&mut self) {
        self.subscription.active = false;
        self.subscription.plan = None;
        self.subscription.valid_until = None;
        self.apply_plan_limits();
    }

    /// Cancel an active subscription whose period has ended.
    ///
    /// Returns true when the subscription lapsed.
    pub fn expire_lapsed_subscription(&mut self, clock: &dyn Clock) -> bool {
        if !self.subscription.active || self.subscription.is_current(clock.now()) {
            return false;
        }
        self.cancel_subscription();
        true
    }

    // =========================================================================
    // MODE
    // =========================================================================

    /// Set the transient learning-mode selector.
    pub fn set_mode(&mut self, mode: Option<LearningMode>) {
        self.mode = mode;
    }

    // =========================================================================
    // ANSWER INTAKE
    // =========================================================================

    /// General-purpose answer intake.
    ///
    /// During a diagnostic the answer advances the step counter (recording
    /// `answer.score` when present) and is exempt from quota accounting.
    /// Otherwise it counts one text step plus any voice seconds.
    pub fn update_from_answer(&mut self, answer: &AnswerMeta, clock: &dyn Clock) -> Accounting {
        self.session.last_active = Some(clock.now());

        if self.diagnostic.active {
            self.diagnostic.steps_completed = self
                .diagnostic
                .steps_completed
                .saturating_add(1)
                .min(self.diagnostic.max_steps);
            if let Some(score) = answer.score {
                self.diagnostic.scores.push(score);
            }
            return Accounting::DiagnosticStep;
        }

        self.add_text_step(clock);
        if let Some(seconds) = answer.voice_seconds {
            self.add_voice_seconds(seconds, clock);
        }
        Accounting::DailyUsage
    }

    // =========================================================================
    // SNAPSHOT
    // =========================================================================

    /// The persisted snapshot as a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value, DanlearnError> {
        serde_json::to_value(self).map_err(|e| DanlearnError::SerializationError(e.to_string()))
    }

    /// Rebuild a record from a snapshot. Missing fields take their defaults.
    pub fn from_json(value: serde_json::Value) -> Result<Self, DanlearnError> {
        serde_json::from_value(value).map_err(|e| DanlearnError::DeserializationError(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDate;

    fn clock() -> ManualClock {
        ManualClock::new(
            DateTime::parse_from_rfc3339("2026-04-10T09:00:00Z")
                .expect("timestamp")
                .with_timezone(&Utc),
        )
    }

    fn user(clock: &ManualClock) -> UserState {
        UserState::new(UserId::new("learner-1").expect("id"), clock)
    }

    fn voice(seconds: u32) -> AnswerMeta {
        AnswerMeta {
            voice_seconds: Some(seconds),
            ..AnswerMeta::default()
        }
    }

    #[test]
    fn new_user_has_defaults() {
        let clock = clock();
        let state = user(&clock);

        assert_eq!(state.ui_language(), UiLanguage::En);
        assert_eq!(state.language_mode(), LanguageMode::EnFull);
        assert!(!state.subscription().active);
        assert_eq!(state.usage().date, NaiveDate::from_ymd_opt(2026, 4, 10).expect("date"));
        assert_eq!(state.usage().voice.limit_seconds, 0);
        assert!(!state.diagnostic().active);
        assert_eq!(state.exam().attempts, 0);
    }

    #[test]
    fn ensure_usage_is_idempotent_within_a_day() {
        let clock = clock();
        let mut state = user(&clock);
        state.add_text_step(&clock);

        clock.advance(Duration::hours(3));
        assert!(!state.ensure_usage_for_today(&clock));
        assert_eq!(state.usage().text.steps_used, 1);
    }

    #[test]
    fn day_rollover_resets_only_usage() {
        let clock = clock();
        let mut state = user(&clock);
        state.activate_subscription(Plan::Pro40, &clock);
        state.start_diagnostic();
        state.add_voice_seconds(300, &clock);

        clock.advance(Duration::days(1));
        assert!(state.ensure_usage_for_today(&clock));

        assert_eq!(state.usage().voice.seconds_used, 0);
        assert_eq!(state.usage().voice.limit_seconds, 2400);
        assert!(state.subscription().active);
        assert!(state.diagnostic().active);
    }

    #[test]
    fn cancel_keeps_seconds_used() {
        let clock = clock();
        let mut state = user(&clock);
        state.activate_subscription(Plan::Basic20, &clock);
        state.add_voice_seconds(100, &clock);

        state.cancel_subscription();

        assert_eq!(state.usage().voice.seconds_used, 100);
        assert_eq!(state.usage().voice.limit_seconds, 0);
        assert_eq!(state.subscription().plan, None);
        assert_eq!(state.subscription().valid_until, None);
    }

    #[test]
    fn activation_grants_thirty_days() {
        let clock = clock();
        let mut state = user(&clock);
        state.activate_subscription(Plan::Basic20, &clock);

        assert_eq!(
            state.subscription().valid_until,
            Some(clock.now() + Duration::days(30))
        );
        assert_eq!(state.usage().voice.limit_seconds, 1200);
    }

    #[test]
    fn subscription_lapses_at_end_of_period() {
        let clock = clock();
        let mut state = user(&clock);
        state.activate_subscription(Plan::Pro40, &clock);

        clock.advance(Duration::days(30) - Duration::seconds(1));
        assert!(!state.expire_lapsed_subscription(&clock));
        assert!(state.subscription().active);

        clock.advance(Duration::seconds(1));
        assert!(state.expire_lapsed_subscription(&clock));
        assert!(!state.subscription().active);
        assert_eq!(state.usage().voice.limit_seconds, 0);
        assert!(!state.expire_lapsed_subscription(&clock));
    }

    #[test]
    fn start_diagnostic_restarts_and_forces_english() {
        let clock = clock();
        let mut state = user(&clock);
        state.ui_language = UiLanguage::Da;
        state.start_diagnostic();
        state.update_from_answer(
            &AnswerMeta {
                score: Some(Score::from_thousandths(300)),
                ..AnswerMeta::default()
            },
            &clock,
        );

        state.start_diagnostic();

        assert_eq!(state.ui_language(), UiLanguage::En);
        assert_eq!(state.diagnostic().steps_completed, 0);
        assert!(state.diagnostic().scores.is_empty());
        assert!(state.diagnostic().active);
    }

    #[test]
    fn stop_diagnostic_keeps_audit_trail() {
        let clock = clock();
        let mut state = user(&clock);
        state.start_diagnostic();
        state.update_from_answer(
            &AnswerMeta {
                score: Some(Score::from_thousandths(800)),
                ..AnswerMeta::default()
            },
            &clock,
        );

        state.stop_diagnostic(Level::PD3);

        assert!(!state.diagnostic().active);
        assert_eq!(state.diagnostic().estimated_level, Some(Level::PD3));
        assert_eq!(state.diagnostic().steps_completed, 1);
        assert_eq!(state.diagnostic().scores.len(), 1);
    }

    #[test]
    fn diagnostic_answer_skips_usage() {
        let clock = clock();
        let mut state = user(&clock);
        state.start_diagnostic();

        let accounted = state.update_from_answer(&voice(90), &clock);

        assert_eq!(accounted, Accounting::DiagnosticStep);
        assert_eq!(state.usage().text.steps_used, 0);
        assert_eq!(state.usage().voice.seconds_used, 0);
        assert_eq!(state.diagnostic().steps_completed, 1);
    }

    #[test]
    fn regular_answer_counts_text_and_voice() {
        let clock = clock();
        let mut state = user(&clock);

        let accounted = state.update_from_answer(&voice(45), &clock);

        assert_eq!(accounted, Accounting::DailyUsage);
        assert_eq!(state.usage().text.steps_used, 1);
        assert_eq!(state.usage().voice.seconds_used, 45);
        assert_eq!(state.session().last_active, Some(clock.now()));
    }

    #[test]
    fn steps_never_exceed_max() {
        let clock = clock();
        let mut state = user(&clock);
        state.start_diagnostic();
        for _ in 0..10 {
            state.update_from_answer(&AnswerMeta::default(), &clock);
        }
        assert_eq!(state.diagnostic().steps_completed, 4);
    }

    #[test]
    fn snapshot_excludes_transient_fields() {
        let clock = clock();
        let mut state = user(&clock);
        state.set_mode(Some(LearningMode::new("exam")));

        let json = state.to_json().expect("serialize");
        let keys: Vec<&str> = json
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();

        assert_eq!(
            keys,
            vec![
                "userId",
                "uiLanguage",
                "languageMode",
                "subscription",
                "usage",
                "diagnostic",
                "exam"
            ]
        );

        let restored = UserState::from_json(json).expect("deserialize");
        assert_eq!(restored.mode(), None);
        assert_eq!(restored.session().last_active, None);
        assert_eq!(restored.usage(), state.usage());
    }

    #[test]
    fn minimal_snapshot_loads_with_defaults() {
        let restored =
            UserState::from_json(serde_json::json!({ "userId": "abc" })).expect("deserialize");
        assert_eq!(restored.user_id().as_str(), "abc");
        assert_eq!(restored.diagnostic().max_steps, 4);
        assert_eq!(restored.usage().text.soft_limit, 30);
    }

    #[test]
    fn snapshot_without_user_id_is_rejected() {
        let result = UserState::from_json(serde_json::json!({ "uiLanguage": "EN" }));
        assert!(matches!(result, Err(DanlearnError::DeserializationError(_))));
    }

    #[test]
    fn oversized_answer_rejected() {
        let answer = AnswerMeta {
            text: Some("a".repeat(MAX_ANSWER_TEXT_LENGTH + 1)),
            ..AnswerMeta::default()
        };
        assert!(answer.validate().is_err());
    }

    #[test]
    fn blank_text_is_no_text() {
        let answer = AnswerMeta {
            text: Some("   ".to_string()),
            ..AnswerMeta::default()
        };
        assert_eq!(answer.answer_text(), None);
    }
}
