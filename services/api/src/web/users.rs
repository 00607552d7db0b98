//! services/api/src/web/users.rs
//!
//! User registration and lookup handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use curator_core::domain::{Topic, User};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::web::state::AppState;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct UserTopicsResponse {
    pub user_id: i64,
    pub topics: Vec<Topic>,
}

/// Registers a new user. Duplicate emails come back as 400.
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload.name.trim();
    let email = payload.email.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation(
            "email must be a valid address".to_string(),
        ));
    }

    let user = state.store.create_user(name, email).await?;
    info!(user_id = user.id, "Registered user");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.store.get_user(user_id).await?))
}

/// Lists the topics linked to a user.
pub async fn user_topics_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserTopicsResponse>, ApiError> {
    state.store.get_user(user_id).await?;
    let topics = state.store.topics_for_user(user_id).await?;
    Ok(Json(UserTopicsResponse { user_id, topics }))
}

#[derive(Serialize)]
pub struct LinkResponse {
    pub message: String,
    pub user_id: i64,
    pub topic_id: i64,
}

/// Links an existing topic to a user. Linking twice is a silent no-op.
pub async fn link_topic_handler(
    State(state): State<Arc<AppState>>,
    Path((user_id, topic_id)): Path<(i64, i64)>,
) -> Result<Json<LinkResponse>, ApiError> {
    state.store.get_user(user_id).await?;
    state.store.get_topic(topic_id).await?;

    let created = state.store.link_topic_to_user(user_id, topic_id).await?;
    Ok(Json(LinkResponse {
        message: if created {
            "Topic linked".to_string()
        } else {
            "Topic was already linked".to_string()
        },
        user_id,
        topic_id,
    }))
}

/// Removes a user's link to a topic. The topic and its content remain.
pub async fn unlink_topic_handler(
    State(state): State<Arc<AppState>>,
    Path((user_id, topic_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.get_user(user_id).await?;
    if !state.store.unlink_topic_from_user(user_id, topic_id).await? {
        return Err(ApiError::Port(curator_core::ports::PortError::NotFound(
            format!("User {user_id} is not linked to topic {topic_id}"),
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
