//! # Danlearn HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /diagnostic/start` - Start (or restart) the placement diagnostic
//! - `POST /diagnostic/step` - Submit one diagnostic answer
//! - `POST /answer` - Account an answer against daily usage
//! - `POST /webhook/billing` - Apply a subscription event
//! - `POST /session/set-mode` - Set the learner's mode selector
//! - `GET /users/{user_id}` - Learner record with today's usage
//! - `POST /users/{user_id}/reset` - Replace a learner record with a fresh one
//!
//! ## Security Configuration
//!
//! - `server.cors_origins`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `server.rate_limit`: Requests per second (default: 100, 0 to disable)
//! - `server.api_key`: If set, requires Bearer token authentication

mod auth;
mod extract;
mod handlers;
mod middleware;
mod types;

pub use auth::ApiKey;
pub use middleware::create_rate_limiter;
// Re-export handlers and types for integration tests (via `danlearn::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    answer_handler, billing_webhook_handler, diagnostic_start_handler, diagnostic_step_handler,
    error_response, health_handler, set_mode_handler, user_reset_handler, user_status_handler,
};
#[allow(unused_imports)]
pub use types::{
    AnswerMetaJson, AnswerRequest, AnswerResponse, BillingRequest, BillingResponse,
    DIAGNOSTIC_LANGUAGE, DIAGNOSTIC_STEP_ACTION, ErrorResponse, HealthResponse, ResultResponse,
    SetModeRequest, SetModeResponse, StartRequest, StepResponse, TaskJson, TurnRequest,
    TurnResponse,
};

use crate::accounting::AccountingService;
use crate::config::{AppConfig, ServerConfig};
use crate::evaluator::{AnswerEvaluator, ChatEvaluator, NeutralEvaluator};
use crate::locks::UserLocks;
use crate::orchestrator::DiagnosticOrchestrator;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use danlearn_core::{Clock, DanlearnError, UserStore};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (2 MiB).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// Both services share one store, one clock and one set of per-user locks,
/// so diagnostic turns and usage accounting never interleave on a record.
#[derive(Clone)]
pub struct AppState {
    pub diagnostics: Arc<DiagnosticOrchestrator>,
    pub accounting: Arc<AccountingService>,
}

impl AppState {
    /// Wire the services over a store, clock and evaluator.
    #[must_use]
    pub fn new(
        store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        evaluator: Arc<dyn AnswerEvaluator>,
        evaluator_timeout: Duration,
    ) -> Self {
        let locks = Arc::new(UserLocks::new());
        Self {
            diagnostics: Arc::new(DiagnosticOrchestrator::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&locks),
                evaluator,
                evaluator_timeout,
            )),
            accounting: Arc::new(AccountingService::new(store, clock, locks)),
        }
    }

    /// Open the configured store and pick the evaluator.
    pub fn from_config(config: &AppConfig) -> Result<Self, DanlearnError> {
        let store = config.storage.open()?;
        tracing::info!(
            backend = %config.storage.backend,
            persistent = store.is_persistent(),
            users = store.user_count()?,
            "Record store opened"
        );

        let evaluator: Arc<dyn AnswerEvaluator> = if config.evaluator.api_key.is_some() {
            tracing::info!(
                model = %config.evaluator.model,
                base_url = %config.evaluator.base_url,
                "Answer evaluator enabled"
            );
            let chat = ChatEvaluator::new(&config.evaluator)
                .map_err(|e| DanlearnError::IoError(e.to_string()))?;
            Arc::new(chat)
        } else {
            tracing::warn!(
                "No evaluator credential configured. Diagnostic answers will receive the neutral score."
            );
            Arc::new(NeutralEvaluator)
        };

        Ok(Self::new(
            Arc::new(store),
            Arc::new(config.clock.system_clock()),
            evaluator,
            config.evaluator.timeout(),
        ))
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from the configured origins.
///
/// - `"*"`: allows all origins (development only)
/// - unset: localhost only
/// - otherwise: comma-separated list of allowed origins
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (cors_origins = \"*\"). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting - protects against floods (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let cors = build_cors_layer(server.cors_origins.as_deref());

    let rate_limiter = if server.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", server.rate_limit);
        Some(create_rate_limiter(server.rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let api_key = ApiKey::from_config(server.api_key.as_deref());
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set DANLEARN_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/diagnostic/start", post(handlers::diagnostic_start_handler))
        .route("/diagnostic/step", post(handlers::diagnostic_step_handler))
        .route("/answer", post(handlers::answer_handler))
        .route("/webhook/billing", post(handlers::billing_webhook_handler))
        .route("/session/set-mode", post(handlers::set_mode_handler))
        .route("/users/{user_id}", get(handlers::user_status_handler))
        .route("/users/{user_id}/reset", post(handlers::user_reset_handler));

    if let Some(key) = api_key {
        router = router.layer(axum_middleware::from_fn_with_state(
            key,
            auth::api_key_auth_middleware,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Open the store, build the services and serve until shutdown.
pub async fn run_server(config: &AppConfig) -> Result<(), DanlearnError> {
    let state = AppState::from_config(config)?;
    let router = create_router(state, &config.server);
    let addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DanlearnError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Danlearn HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| DanlearnError::IoError(format!("Server error: {}", e)))
}
