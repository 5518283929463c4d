//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::NaiveDate;
use danlearn::api::{
    AnswerMetaJson, AnswerResponse, BillingRequest, HealthResponse, StartRequest, TurnRequest,
    TurnResponse,
};
use danlearn_core::{
    Accounting, Confidence, DIAGNOSTIC_TASKS, DailyUsage, DiagnosticResult, Level, Score,
    TurnOutcome, UserId,
};

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

// =============================================================================
// REQUEST TESTS
// =============================================================================

#[test]
fn test_start_request_user_id_is_optional() {
    let request: StartRequest = serde_json::from_str("{}").unwrap();
    assert_eq!(request.user_id, None);

    let request: StartRequest = serde_json::from_str(r#"{"userId":"ana"}"#).unwrap();
    assert_eq!(request.user_id.as_deref(), Some("ana"));
}

#[test]
fn test_turn_request_camel_case() {
    let json = r#"{"userId":"ana","answerMeta":{"text":"hej","voiceSeconds":12,"score":0.25}}"#;
    let request: TurnRequest = serde_json::from_str(json).unwrap();

    let meta = request.answer_meta.unwrap().to_answer_meta().unwrap();
    assert_eq!(meta.text.as_deref(), Some("hej"));
    assert_eq!(meta.voice_seconds, Some(12));
    assert_eq!(meta.score, Some(Score::from_thousandths(250)));
}

#[test]
fn test_answer_meta_rejects_out_of_range_score() {
    let meta = AnswerMetaJson {
        score: Some(-0.1),
        ..AnswerMetaJson::default()
    };
    assert!(meta.to_answer_meta().is_err());
}

#[test]
fn test_answer_meta_rounds_fractional_voice_up() {
    let request: TurnRequest =
        serde_json::from_str(r#"{"userId":"ana","answerMeta":{"voiceSeconds":12.5}}"#).unwrap();
    let meta = request.answer_meta.unwrap().to_answer_meta().unwrap();
    assert_eq!(meta.voice_seconds, Some(13));
}

#[test]
fn test_answer_meta_rejects_negative_voice() {
    let meta = AnswerMetaJson {
        voice_seconds: Some(-3.0),
        ..AnswerMetaJson::default()
    };
    assert!(meta.to_answer_meta().is_err());
}

#[test]
fn test_billing_request_plan_optional() {
    let request: BillingRequest =
        serde_json::from_str(r#"{"userId":"u","event":"subscription_cancelled"}"#).unwrap();
    assert_eq!(request.plan, None);
    assert_eq!(request.event.as_deref(), Some("subscription_cancelled"));
    assert!(request.to_event().is_ok());
}

#[test]
fn test_billing_request_without_event_is_invalid() {
    let request: BillingRequest = serde_json::from_str(r#"{"userId":"u"}"#).unwrap();
    assert_eq!(request.event, None);
    assert!(request.to_event().is_err());
}

// =============================================================================
// TURN RESPONSE TESTS
// =============================================================================

#[test]
fn test_step_response_shape() {
    let response = TurnResponse::from(TurnOutcome::Step {
        step: 3,
        task: Some(&DIAGNOSTIC_TASKS[2]),
    });

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["action"], "DIAGNOSTIC_STEP");
    assert_eq!(json["step"], 3);
    assert_eq!(json["task"]["type"], "production");
    assert_eq!(json["task"]["level"], "B1");
    assert_eq!(json["languageMode"], "EN");
}

#[test]
fn test_result_response_shape() {
    let response = TurnResponse::from(TurnOutcome::Finalized(DiagnosticResult {
        level: Level::PD2,
        confidence: Confidence::High,
        avg_score: Some(Score::from_thousandths(550)),
    }));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["diagnosticResult"]["level"], "PD2");
    assert_eq!(json["diagnosticResult"]["confidence"], "high");
    assert_eq!(json["diagnosticResult"]["avgScore"], 0.55);
    assert!(json.get("action").is_none());
}

#[test]
fn test_turn_response_deserializes_both_variants() {
    let step: TurnResponse = serde_json::from_str(
        r#"{"action":"DIAGNOSTIC_STEP","step":2,"task":null,"languageMode":"EN"}"#,
    )
    .unwrap();
    assert!(matches!(step, TurnResponse::Step(ref s) if s.step == 2));

    let result: TurnResponse = serde_json::from_str(
        r#"{"diagnosticResult":{"level":"A2","confidence":"low"},"languageMode":"EN"}"#,
    )
    .unwrap();
    assert!(matches!(result, TurnResponse::Result(ref r) if r.diagnostic_result.level == Level::A2));
}

// =============================================================================
// ANSWER RESPONSE TESTS
// =============================================================================

#[test]
fn test_answer_response_reports_remaining_voice() {
    let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    let usage = DailyUsage::fresh(date, 1200);
    let response = AnswerResponse::new(&UserId::new("u").unwrap(), Accounting::DailyUsage, &usage);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["userId"], "u");
    assert_eq!(json["accounted"], "usage");
    assert_eq!(json["voiceSecondsRemaining"], 1200);
    assert_eq!(json["usage"]["date"], "2026-03-02");
}
