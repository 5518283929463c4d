//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use danlearn_core::{
    Accounting, AnswerMeta, DailyUsage, DanlearnError, DiagnosticResult, DiagnosticTask,
    LearningMode, Score, Subscription, TurnOutcome, UserId,
};
use crate::accounting::BillingEvent;
use serde::{Deserialize, Serialize};

/// Language tag of every diagnostic response.
pub const DIAGNOSTIC_LANGUAGE: &str = "EN";

/// `action` value of a step response.
pub const DIAGNOSTIC_STEP_ACTION: &str = "DIAGNOSTIC_STEP";

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

// =============================================================================
// SHARED REQUEST PIECES
// =============================================================================

/// Validate a `userId` request field.
pub fn parse_user_id(raw: Option<&str>) -> Result<UserId, DanlearnError> {
    match raw {
        Some(id) => UserId::new(id),
        None => Err(DanlearnError::InvalidUserId("userId is required".to_string())),
    }
}

/// Answer metadata as sent by clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerMetaJson {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice_seconds: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl AnswerMetaJson {
    /// Convert to core metadata, validating the score range and text size.
    ///
    /// Fractional voice durations are rounded up to whole seconds.
    pub fn to_answer_meta(&self) -> Result<AnswerMeta, DanlearnError> {
        let score = self.score.map(Score::try_from).transpose()?;
        let voice_seconds = self.voice_seconds.map(whole_seconds).transpose()?;
        let meta = AnswerMeta {
            text: self.text.clone(),
            voice_seconds,
            score,
        };
        meta.validate()?;
        Ok(meta)
    }
}

fn whole_seconds(raw: f64) -> Result<u32, DanlearnError> {
    if !raw.is_finite() || raw < 0.0 {
        return Err(DanlearnError::InvalidAnswer(format!(
            "voiceSeconds {} must be a non-negative number",
            raw
        )));
    }
    // `as` saturates at u32::MAX
    Ok(raw.ceil() as u32)
}

// =============================================================================
// DIAGNOSTIC
// =============================================================================

/// `POST /diagnostic/start` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `POST /diagnostic/step` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub answer_meta: Option<AnswerMetaJson>,
}

/// A diagnostic task as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskJson {
    #[serde(rename = "type")]
    pub kind: String,
    pub level: String,
    pub focus: String,
    pub instruction: String,
}

impl From<&DiagnosticTask> for TaskJson {
    fn from(task: &DiagnosticTask) -> Self {
        Self {
            kind: task.kind.to_string(),
            level: task.level.to_string(),
            focus: task.focus.to_string(),
            instruction: task.instruction.to_string(),
        }
    }
}

/// The diagnostic continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub action: String,
    pub step: u8,
    pub task: Option<TaskJson>,
    pub language_mode: String,
}

/// The diagnostic is finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    pub diagnostic_result: DiagnosticResult,
    pub language_mode: String,
}

/// Response of `/diagnostic/start` and `/diagnostic/step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnResponse {
    Step(StepResponse),
    Result(ResultResponse),
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Step { step, task } => TurnResponse::Step(StepResponse {
                action: DIAGNOSTIC_STEP_ACTION.to_string(),
                step,
                task: task.map(TaskJson::from),
                language_mode: DIAGNOSTIC_LANGUAGE.to_string(),
            }),
            TurnOutcome::Finalized(result) | TurnOutcome::AlreadyFinished(result) => {
                TurnResponse::Result(ResultResponse {
                    diagnostic_result: result,
                    language_mode: DIAGNOSTIC_LANGUAGE.to_string(),
                })
            }
        }
    }
}

// =============================================================================
// ANSWER INTAKE
// =============================================================================

/// `POST /answer` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub answer_meta: Option<AnswerMetaJson>,
}

/// `POST /answer` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub user_id: String,
    /// `"diagnostic"` or `"usage"`.
    pub accounted: String,
    pub usage: DailyUsage,
    pub voice_seconds_remaining: u32,
}

impl AnswerResponse {
    pub fn new(user_id: &UserId, accounted: Accounting, usage: &DailyUsage) -> Self {
        let accounted = match accounted {
            Accounting::DiagnosticStep => "diagnostic",
            Accounting::DailyUsage => "usage",
        };
        Self {
            user_id: user_id.to_string(),
            accounted: accounted.to_string(),
            usage: usage.clone(),
            voice_seconds_remaining: usage.voice_seconds_remaining(),
        }
    }
}

// =============================================================================
// BILLING
// =============================================================================

/// `POST /webhook/billing` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

impl BillingRequest {
    /// Validate the event name and plan.
    pub fn to_event(&self) -> Result<BillingEvent, DanlearnError> {
        let event = self
            .event
            .as_deref()
            .ok_or_else(|| DanlearnError::InvalidAnswer("event is required".to_string()))?;
        BillingEvent::parse(event, self.plan.as_deref())
    }
}

/// `POST /webhook/billing` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingResponse {
    pub status: String,
    pub subscription: Subscription,
}

impl BillingResponse {
    pub fn ok(subscription: Subscription) -> Self {
        Self {
            status: "ok".to_string(),
            subscription,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// `POST /session/set-mode` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetModeRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl SetModeRequest {
    /// The requested mode, if present and non-blank.
    pub fn to_mode(&self) -> Option<LearningMode> {
        self.mode
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(LearningMode::new)
    }
}

/// `POST /session/set-mode` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetModeResponse {
    pub status: String,
    pub mode: String,
}

impl SetModeResponse {
    pub fn ok(mode: LearningMode) -> Self {
        Self {
            status: "ok".to_string(),
            mode: mode.0,
        }
    }
}
