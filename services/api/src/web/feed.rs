//! services/api/src/web/feed.rs
//!
//! The daily feed view and the user-triggered refresh endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::{NaiveDate, Utc};
use curator_core::domain::ContentItem;
use curator_core::ports::PortError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::{FleetCoordinator, TopicReport, TopicWorker};
use crate::error::ApiError;
use crate::web::state::AppState;

/// Per-topic item cap in the daily feed view.
const FEED_ITEMS_PER_TOPIC: i64 = 10;

#[derive(Deserialize)]
pub struct FeedQuery {
    /// `YYYY-MM-DD`; defaults to today (UTC).
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct TopicFeed {
    pub topic_id: i64,
    pub topic_name: String,
    pub items: Vec<ContentItem>,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub user_id: i64,
    pub date: NaiveDate,
    pub topics: Vec<TopicFeed>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub total_items_fetched: u64,
    pub results: std::collections::BTreeMap<String, TopicReport>,
}

/// Returns the user's feed for one UTC calendar date, grouped by topic.
/// Topics with nothing fetched that day are omitted.
pub async fn get_feed_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, ApiError> {
    state.store.get_user(user_id).await?;

    let date = match query.date {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            ApiError::Validation(format!("'{raw}' is not a valid date (expected YYYY-MM-DD)"))
        })?,
        None => Utc::now().date_naive(),
    };

    let mut topics = Vec::new();
    for topic in state.store.topics_for_user(user_id).await? {
        let worker =
            TopicWorker::load(state.store.clone(), state.gateway.clone(), topic.id).await?;
        let items = worker.content_for_date(date, FEED_ITEMS_PER_TOPIC).await?;
        if !items.is_empty() {
            topics.push(TopicFeed {
                topic_id: topic.id,
                topic_name: topic.name,
                items,
            });
        }
    }

    Ok(Json(FeedResponse {
        user_id,
        date,
        topics,
    }))
}

/// Fetches fresh content for every one of the user's topics, synchronously.
pub async fn refresh_feed_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<RefreshResponse>, ApiError> {
    state.store.get_user(user_id).await?;

    let fleet = FleetCoordinator::new(
        state.store.clone(),
        state.gateway.clone(),
        state.config.refresh_pacing,
        state.config.max_items_per_fetch,
    );
    let report = fleet.sweep_user(user_id).await?;

    let message = format!(
        "Feed refresh complete: {}/{} topics updated",
        report.topics_succeeded(),
        report.topics_swept()
    );
    info!(user_id, %message);

    Ok(Json(RefreshResponse {
        message,
        total_items_fetched: report.total_items(),
        results: report.results,
    }))
}

#[derive(Serialize)]
pub struct TopicRefreshResponse {
    pub message: String,
    pub topic_id: i64,
    pub items_fetched: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fetches fresh content for a single topic. The user must be linked to it.
pub async fn refresh_topic_handler(
    State(state): State<Arc<AppState>>,
    Path((user_id, topic_id)): Path<(i64, i64)>,
) -> Result<Json<TopicRefreshResponse>, ApiError> {
    state.store.get_user(user_id).await?;
    let topic = state.store.get_topic(topic_id).await?;
    if !state.store.is_topic_linked(user_id, topic_id).await? {
        return Err(ApiError::Port(PortError::Unauthorized));
    }

    let mut worker =
        TopicWorker::load(state.store.clone(), state.gateway.clone(), topic_id).await?;
    let outcome = worker
        .fetch_content(state.config.max_items_per_fetch)
        .await?;

    let message = if outcome.succeeded() {
        format!("Refreshed topic '{}'", topic.name)
    } else {
        format!("Refresh failed for topic '{}'", topic.name)
    };
    Ok(Json(TopicRefreshResponse {
        message,
        topic_id,
        items_fetched: outcome.items.len() as u64,
        error: outcome.failure,
    }))
}
