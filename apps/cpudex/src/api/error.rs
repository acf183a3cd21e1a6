//! HTTP error mapping.
//!
//! Client-caused failures surface their message; unexpected storage faults
//! are logged and returned as a generic 500 so internals never leak.

use crate::api::auth::AuthError;
use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] cpudex_core::Error),

    #[error(transparent)]
    Auth(AuthError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Core(err) => core_response(err),
            Self::Auth(AuthError::NotConfigured) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("admin password not configured"),
            )
                .into_response(),
            Self::Auth(err) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                detail(&err.to_string()),
            )
                .into_response(),
        }
    }
}

fn core_response(err: cpudex_core::Error) -> Response {
    use cpudex_core::Error;
    match &err {
        Error::Validation { .. } | Error::ImportSource(_) => {
            (StatusCode::BAD_REQUEST, detail(&err.to_string())).into_response()
        }
        Error::NotFound(id) => (
            StatusCode::NOT_FOUND,
            detail(&format!("CPU with ID {id} not found")),
        )
            .into_response(),
        _ => {
            error!("request failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("internal server error"),
            )
                .into_response()
        }
    }
}

fn detail(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "detail": message }))
}

// =============================================================================
// TESTS
// =============================================================================
