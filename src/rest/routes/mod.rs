pub mod contact;
pub mod health;
pub mod login;
pub mod projects;

use axum::http::{header, HeaderMap};

use crate::error::ApiError;
use crate::AppContext;

/// Check the bearer token carried in the `Authorization` header against the
/// session registry.
pub(crate) async fn require_auth(ctx: &AppContext, headers: &HeaderMap) -> Result<(), ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    ctx.tokens.validate(header).await?;
    Ok(())
}

/// Catch-all for unknown method/path pairs.
pub(crate) async fn not_found() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}
