//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    extract::ApiJson,
    types::{
        AnswerMetaJson, AnswerRequest, AnswerResponse, BillingRequest, BillingResponse, ErrorResponse,
        HealthResponse, SetModeRequest, SetModeResponse, StartRequest, TurnRequest, TurnResponse,
        parse_user_id,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use danlearn_core::{AnswerMeta, DanlearnError, UserId};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Map a core error to a status code and `{error}` body.
pub fn error_response(e: &DanlearnError) -> Response {
    let status = match e {
        DanlearnError::InvalidUserId(_)
        | DanlearnError::InvalidAnswer(_)
        | DanlearnError::DiagnosticNotInitialized => StatusCode::BAD_REQUEST,
        DanlearnError::TurnConflict(_) => StatusCode::CONFLICT,
        DanlearnError::SerializationError(_)
        | DanlearnError::DeserializationError(_)
        | DanlearnError::IoError(_) => {
            tracing::error!(error = %e, "Persistence failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(e.to_string()))).into_response()
}

fn answer_meta(raw: Option<&AnswerMetaJson>) -> Result<AnswerMeta, DanlearnError> {
    raw.map(|meta| meta.to_answer_meta())
        .transpose()
        .map(Option::unwrap_or_default)
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// DIAGNOSTIC HANDLERS
// =============================================================================

/// Start (or restart) the diagnostic.
pub async fn diagnostic_start_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StartRequest>,
) -> Response {
    let user_id = match parse_user_id(request.user_id.as_deref()) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.diagnostics.start(&user_id).await {
        Ok(outcome) => (StatusCode::OK, Json(TurnResponse::from(outcome))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Submit one diagnostic answer.
pub async fn diagnostic_step_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TurnRequest>,
) -> Response {
    let parsed = parse_user_id(request.user_id.as_deref())
        .and_then(|id| Ok((id, answer_meta(request.answer_meta.as_ref())?)));
    let (user_id, answer) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return error_response(&e),
    };

    match state.diagnostics.step(&user_id, &answer).await {
        Ok(outcome) => (StatusCode::OK, Json(TurnResponse::from(outcome))).into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// ANSWER HANDLER
// =============================================================================

/// Account a regular (or in-diagnostic) answer against daily usage.
pub async fn answer_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AnswerRequest>,
) -> Response {
    let parsed = parse_user_id(request.user_id.as_deref())
        .and_then(|id| Ok((id, answer_meta(request.answer_meta.as_ref())?)));
    let (user_id, answer) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return error_response(&e),
    };

    match state.accounting.record_answer(&user_id, &answer).await {
        Ok((record, accounted)) => (
            StatusCode::OK,
            Json(AnswerResponse::new(&user_id, accounted, record.usage())),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// BILLING HANDLER
// =============================================================================

/// Apply a subscription event from the billing system.
pub async fn billing_webhook_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BillingRequest>,
) -> Response {
    let parsed = parse_user_id(request.user_id.as_deref())
        .and_then(|id| Ok((id, request.to_event()?)));
    let (user_id, event) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return error_response(&e),
    };

    match state.accounting.apply_billing_event(&user_id, event).await {
        Ok(record) => (
            StatusCode::OK,
            Json(BillingResponse::ok(record.subscription().clone())),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// SESSION HANDLER
// =============================================================================

/// Set the learner's mode selector.
pub async fn set_mode_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SetModeRequest>,
) -> Response {
    let (user_id, mode) = match (request.user_id.as_deref(), request.to_mode()) {
        (Some(id), Some(mode)) => match UserId::new(id) {
            Ok(id) => (id, mode),
            Err(e) => return error_response(&e),
        },
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("userId and mode are required")),
            )
                .into_response();
        }
    };

    match state.accounting.set_mode(&user_id, mode.clone()).await {
        Ok(_) => (StatusCode::OK, Json(SetModeResponse::ok(mode))).into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// USER HANDLERS
// =============================================================================

/// Snapshot view of a learner with today's usage.
pub async fn user_status_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    let user_id = match UserId::new(user_id) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.accounting.user_status(&user_id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Replace a learner's record with a fresh default one.
pub async fn user_reset_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    let user_id = match UserId::new(user_id) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.accounting.reset_user(&user_id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(&e),
    }
}
