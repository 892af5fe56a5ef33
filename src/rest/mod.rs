// rest/mod.rs — Public HTTP API server.
//
// Axum router for the portfolio backend.
//
// Endpoints:
//   GET    /api/health          (no auth)
//   GET    /api/projects        (no auth)
//   POST   /api/auth/login      (no auth)
//   POST   /api/projects        (bearer token)
//   DELETE /api/projects/{id}   (bearer token)
//   POST   /api/contact         (no auth)

pub mod routes;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::AppContext;

/// Inbound request bodies are capped at 1 MB; larger payloads are rejected
/// before being parsed.
pub const MAX_BODY_BYTES: usize = 1_000_000;

pub async fn serve(ctx: Arc<AppContext>, listener: tokio::net::TcpListener) -> Result<()> {
    let router = build_router(ctx);
    info!("API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = cors_layer(&ctx.config.allowed_origins);
    Router::new()
        // Health (no auth)
        .route("/api/health", get(routes::health::health))
        // Projects
        .route(
            "/api/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route("/api/projects/{id}", delete(routes::projects::delete_project))
        // Admin login
        .route("/api/auth/login", post(routes::login::login))
        // Contact form
        .route("/api/contact", post(routes::contact::submit_contact))
        .fallback(routes::not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(ctx)
}

/// Cross-origin policy from config: a `"*"` entry mirrors whatever origin
/// the request carries, otherwise only the listed origins are allowed.
/// Mirroring (rather than a literal `*`) keeps credentialed requests legal.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
