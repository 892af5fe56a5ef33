use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::mail::Mailer;
use crate::AppContext;

/// Minimal syntactic shape: a local part, `@`, and a domain with a dot.
static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles"));

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// Relay one contact submission as email.
///
/// Every attempt that passes validation leaves exactly one submission-log
/// block, marked by outcome, whatever the relay does.
pub async fn submit_contact(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let name = body.name.trim();
    let email = body.email.trim();
    let message = body.message.trim();

    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(ApiError::Validation(
            "name, email and message are required".to_string(),
        ));
    }
    if !EMAIL_SHAPE.is_match(email) {
        return Err(ApiError::Validation(
            "a valid email address is required".to_string(),
        ));
    }

    let mailer = match Mailer::from_config(&ctx.config.relay) {
        Ok(mailer) => mailer,
        Err(e) => {
            ctx.contact_log.append(name, email, message, false).await;
            return Err(ApiError::Config(e.to_string()));
        }
    };

    match mailer.send_contact(name, email, message).await {
        Ok(()) => {
            ctx.contact_log.append(name, email, message, true).await;
            Ok(Json(json!({
                "message": "message sent — I'll be in touch soon"
            })))
        }
        Err(e) => {
            ctx.contact_log.append(name, email, message, false).await;
            warn!(err = %e, "contact delivery failed");
            Err(ApiError::Delivery(
                "could not deliver the message, try again later".to_string(),
            ))
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
