//! # Request Extractors
//!
//! `ApiJson` wraps axum's `Json` extractor so that malformed bodies are
//! answered with the same `{error}` JSON as every other client error.

use super::types::ErrorResponse;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// JSON body extractor that rejects with HTTP 400 and an `{error}` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), "Rejected request body");
                Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(rejection.body_text())),
                )
                    .into_response())
            }
        }
    }
}
