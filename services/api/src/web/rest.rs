//! services/api/src/web/rest.rs
//!
//! Service-level handlers and the master definition for the OpenAPI
//! specification.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::json;
use utoipa::OpenApi;

use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        health_handler,
    ),
    tags(
        (name = "AI Curator API", description = "Personalized content curation and learning feeds.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Service Handlers
//=========================================================================================

/// Service banner.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service name and version")
    )
)]
pub async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "service": "ai-curator",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness probe. Reports whether the background scheduler is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let scheduler = state.scheduler.status().await;
    Json(json!({
        "status": "healthy",
        "scheduler": scheduler.status,
    }))
}
