use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppContext;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

/// Compare the submitted secret against the configured one; a match issues
/// a fresh session token, anything else is a 401 with no token minted.
pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;

    if body.password != ctx.config.admin_secret {
        return Err(ApiError::Auth("invalid password".to_string()));
    }

    let token = ctx.tokens.issue().await;
    info!("admin session issued");
    Ok(Json(json!({
        "token": token,
        "expiresInMinutes": ctx.config.token_ttl_minutes,
    })))
}
