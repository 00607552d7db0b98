//! services/api/src/web/scheduler.rs
//!
//! Scheduler observability and manual trigger handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use crate::agents::TopicReport;
use crate::error::ApiError;
use crate::scheduler::SchedulerStatus;
use crate::web::state::AppState;

#[derive(Serialize)]
pub struct TriggerFetchResponse {
    pub message: String,
    pub topics_succeeded: usize,
    pub topics_failed: usize,
    pub total_items_fetched: u64,
    pub results: std::collections::BTreeMap<String, TopicReport>,
}

#[derive(Serialize)]
pub struct TriggerCleanupResponse {
    pub message: String,
    pub items_deleted: u64,
}

pub async fn scheduler_status_handler(
    State(state): State<Arc<AppState>>,
) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

/// Runs a full fleet sweep right now and reports the outcome, including
/// per-topic failures.
pub async fn trigger_fetch_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TriggerFetchResponse>, ApiError> {
    let report = state.scheduler.trigger_fetch_now().await?;
    Ok(Json(TriggerFetchResponse {
        message: format!(
            "Fetch complete: {}/{} topics succeeded",
            report.topics_succeeded(),
            report.topics_swept()
        ),
        topics_succeeded: report.topics_succeeded(),
        topics_failed: report.topics_failed(),
        total_items_fetched: report.total_items(),
        results: report.results,
    }))
}

/// Runs the retention cleanup right now.
pub async fn trigger_cleanup_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TriggerCleanupResponse>, ApiError> {
    let deleted = state.scheduler.trigger_cleanup_now().await?;
    Ok(Json(TriggerCleanupResponse {
        message: "Cleanup complete".to_string(),
        items_deleted: deleted,
    }))
}
