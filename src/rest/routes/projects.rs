use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::require_auth;
use crate::error::ApiError;
use crate::store::{NewProject, Project};
use crate::AppContext;

pub async fn list_projects(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(ctx.store.list().await?))
}

pub async fn create_project(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    payload: Result<Json<NewProject>, JsonRejection>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    require_auth(&ctx, &headers).await?;
    let Json(input) = payload?;
    let project = ctx.store.create(input).await?;
    info!(id = %project.id, title = %project.title, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn delete_project(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_auth(&ctx, &headers).await?;
    ctx.store.delete(&id).await?;
    info!(id = %id, "project deleted");
    Ok(Json(json!({ "message": "project removed" })))
}
