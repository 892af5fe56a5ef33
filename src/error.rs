//! Error taxonomy for the HTTP API.
//!
//! Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl is
//! the single point where errors become structured `{"message": ...}` JSON.
//! Nothing escapes a handler as an unstructured failure.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::mail::{MailConfigError, SmtpError};
use crate::store::StoreError;

/// Handler-level error, mapped to an HTTP status at the dispatch boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing required input → 400.
    #[error("{0}")]
    Validation(String),
    /// Request body exceeded the inbound cap → 413.
    #[error("payload too large")]
    PayloadTooLarge,
    /// Missing, invalid or expired credentials → 401.
    #[error("{0}")]
    Auth(String),
    /// Unknown record id → 404.
    #[error("{0}")]
    NotFound(String),
    /// Operator misconfiguration (relay or recipient unset) → 500.
    #[error("{0}")]
    Config(String),
    /// The mail exchange failed or timed out → 502.
    #[error("{0}")]
    Delivery(String),
    /// Corrupt store or any other unexpected failure → 500.
    /// The cause is logged; the caller sees a generic message.
    #[error("internal server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Delivery(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            tracing::error!(err = %cause, "unexpected server error");
        }
        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(msg) => ApiError::Validation(msg),
            StoreError::NotFound(id) => ApiError::NotFound(format!("project not found: {id}")),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err.to_string())
    }
}

impl From<SmtpError> for ApiError {
    fn from(err: SmtpError) -> Self {
        ApiError::Delivery(err.to_string())
    }
}

impl From<MailConfigError> for ApiError {
    fn from(err: MailConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}

/// A body that failed extraction is the caller's fault: a cap overrun keeps
/// its 413 identity, everything else collapses to a generic invalid-payload
/// message rather than leaking parser detail.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::Validation("invalid payload".to_string())
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
