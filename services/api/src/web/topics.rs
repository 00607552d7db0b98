//! services/api/src/web/topics.rs
//!
//! Topic administration handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use curator_core::domain::{Topic, TopicUpdate};
use serde::Serialize;
use tracing::info;

use crate::agents::master::validate_topic_name;
use crate::error::ApiError;
use crate::web::state::AppState;

#[derive(Serialize)]
pub struct TopicUpdateResponse {
    pub message: String,
    pub topic: Topic,
}

#[derive(Serialize)]
pub struct TopicDeleteResponse {
    pub message: String,
    pub topic_id: i64,
}

/// Applies a partial update to a topic. `None` fields are left untouched.
pub async fn update_topic_handler(
    State(state): State<Arc<AppState>>,
    Path(topic_id): Path<i64>,
    Json(mut update): Json<TopicUpdate>,
) -> Result<Json<TopicUpdateResponse>, ApiError> {
    if let Some(name) = update.name.take() {
        let name = name.trim().to_string();
        if !validate_topic_name(&name) {
            return Err(ApiError::Validation(format!(
                "'{name}' is not a valid topic name"
            )));
        }
        update.name = Some(name);
    }

    let topic = state.store.update_topic(topic_id, update).await?;
    info!(topic_id, "Updated topic");
    Ok(Json(TopicUpdateResponse {
        message: "Topic updated successfully".to_string(),
        topic,
    }))
}

/// Deletes a topic; its content, links and bookmarks cascade away.
pub async fn delete_topic_handler(
    State(state): State<Arc<AppState>>,
    Path(topic_id): Path<i64>,
) -> Result<Json<TopicDeleteResponse>, ApiError> {
    state.store.delete_topic(topic_id).await?;
    info!(topic_id, "Deleted topic");
    Ok(Json(TopicDeleteResponse {
        message: "Topic deleted successfully".to_string(),
        topic_id,
    }))
}
