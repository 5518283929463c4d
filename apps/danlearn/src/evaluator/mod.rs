//! # Answer Evaluator
//!
//! Scores a free-text diagnostic answer in `[0,1]` against its task.
//!
//! Evaluation never fails from the caller's point of view: every internal
//! error degrades to the neutral score (0.5) so a flaky upstream can never
//! abort a diagnostic turn. Parsing is a separate pure function,
//! [`parse_score`], so it can be tested without a network.

mod chat;

pub use chat::ChatEvaluator;

use async_trait::async_trait;
use danlearn_core::primitives::NEUTRAL_SCORE;
use danlearn_core::{DiagnosticTask, Score};
use thiserror::Error;

// =============================================================================
// TRAIT
// =============================================================================

/// A capability that scores one answer.
#[async_trait]
pub trait AnswerEvaluator: Send + Sync {
    /// Score `text` as an answer to `task`. Infallible by contract.
    async fn evaluate(&self, task: &DiagnosticTask, text: &str) -> Score;
}

/// The score substituted when evaluation is impossible.
#[must_use]
pub fn neutral_score() -> Score {
    Score::from_thousandths(NEUTRAL_SCORE)
}

// =============================================================================
// NEUTRAL EVALUATOR
// =============================================================================

/// Evaluator used when no credential is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralEvaluator;

#[async_trait]
impl AnswerEvaluator for NeutralEvaluator {
    async fn evaluate(&self, _task: &DiagnosticTask, _text: &str) -> Score {
        neutral_score()
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Internal evaluator failures. Logged, never returned to the orchestrator.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// No API key configured.
    #[error("Evaluator credential missing")]
    MissingCredential,
    /// The HTTP client could not be constructed.
    #[error("Cannot build evaluator client: {0}")]
    ClientBuild(String),
    /// Cannot reach the completions endpoint.
    #[error("Cannot connect to evaluator at {0}")]
    ConnectionFailed(String),
    /// 401 Unauthorized.
    #[error("Evaluator rejected the credential")]
    Unauthorized,
    /// 429 Too Many Requests.
    #[error("Evaluator rate limited")]
    RateLimited,
    /// Any other non-success status.
    #[error("Evaluator error ({0}): {1}")]
    ServerError(u16, String),
    /// The response carried no usable score.
    #[error("Evaluator parse error: {0}")]
    ParseError(String),
}

// =============================================================================
// PROMPT & PARSING
// =============================================================================

/// Examiner prompt for one answer.
#[must_use]
pub fn build_prompt(task: &DiagnosticTask, text: &str) -> String {
    format!(
        "You are a Danish language examiner.\n\
         \n\
         Evaluate the following Danish learner answer.\n\
         \n\
         Task focus: {focus}\n\
         Target level: {level}\n\
         \n\
         User answer:\n\
         \"{text}\"\n\
         \n\
         Return ONLY valid JSON in this format:\n\
         {{ \"score\": number_between_0_and_1 }}\n\
         \n\
         Scoring guidelines:\n\
         0.0–0.3 = very weak (clear A1/A2)\n\
         0.4–0.6 = mid level (PD2 range)\n\
         0.7–1.0 = strong (PD3 ready)\n\
         \n\
         Be strict but fair.\n",
        focus = task.focus,
        level = task.level,
        text = text,
    )
}

/// Extract a score from a model response.
///
/// Accepts a bare JSON object, one wrapped in a Markdown code fence, or one
/// embedded in surrounding prose. The `score` field must be a number; it is
/// clamped into `[0,1]`.
#[must_use]
pub fn parse_score(raw: &str) -> Option<Score> {
    let body = strip_code_fence(raw.trim());
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    let object = body.get(start..=end)?;
    let value: serde_json::Value = serde_json::from_str(object).ok()?;
    let score = value.get("score")?.as_f64()?;
    Score::from_fraction_clamped(score)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use danlearn_core::DIAGNOSTIC_TASKS;

    #[test]
    fn parses_bare_object() {
        assert_eq!(
            parse_score(r#"{ "score": 0.65 }"#),
            Some(Score::from_thousandths(650))
        );
    }

    #[test]
    fn parses_fenced_object() {
        let raw = "```json\n{\"score\": 0.3}\n```";
        assert_eq!(parse_score(raw), Some(Score::from_thousandths(300)));
    }

    #[test]
    fn parses_object_in_prose() {
        let raw = "Here is my evaluation: {\"score\": 0.8} Hope this helps.";
        assert_eq!(parse_score(raw), Some(Score::from_thousandths(800)));
    }

    #[test]
    fn clamps_out_of_range() {
        assert_eq!(parse_score(r#"{"score": 1.7}"#), Some(Score::MAX));
        assert_eq!(parse_score(r#"{"score": -2}"#), Some(Score::ZERO));
    }

    #[test]
    fn rejects_missing_or_non_numeric() {
        assert_eq!(parse_score("no json here"), None);
        assert_eq!(parse_score(r#"{"grade": 0.5}"#), None);
        assert_eq!(parse_score(r#"{"score": "high"}"#), None);
        assert_eq!(parse_score("{broken"), None);
        assert_eq!(parse_score(""), None);
    }

    #[test]
    fn prompt_names_task() {
        let prompt = build_prompt(&DIAGNOSTIC_TASKS[1], "Jeg står op klokken syv.");
        assert!(prompt.contains("Task focus: routine"));
        assert!(prompt.contains("Target level: A2/B1"));
        assert!(prompt.contains("\"Jeg står op klokken syv.\""));
        assert!(prompt.contains("{ \"score\": number_between_0_and_1 }"));
    }

    #[tokio::test]
    async fn neutral_evaluator_returns_half() {
        let score = NeutralEvaluator.evaluate(&DIAGNOSTIC_TASKS[0], "hej").await;
        assert_eq!(score, Score::from_thousandths(500));
    }
}
