//! services/api/src/web/saved.rs
//!
//! Bookmark handlers: save, list, unsave.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use curator_core::domain::ContentItem;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::web::state::AppState;

#[derive(Deserialize)]
pub struct SaveContentRequest {
    pub user_id: i64,
    pub content_id: i64,
}

#[derive(Serialize)]
pub struct SaveContentResponse {
    pub message: String,
    pub saved_id: i64,
}

#[derive(Serialize)]
pub struct SavedItem {
    pub saved_id: i64,
    pub saved_at: DateTime<Utc>,
    pub content: ContentItem,
}

#[derive(Serialize)]
pub struct SavedListResponse {
    pub user_id: i64,
    pub total_saved: usize,
    pub items: Vec<SavedItem>,
}

/// Bookmarks a content item for a user. Saving the same pair twice is a 400.
pub async fn save_content_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SaveContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.get_user(payload.user_id).await?;
    state.store.get_content(payload.content_id).await?;

    let bookmark = state
        .store
        .save_bookmark(payload.user_id, payload.content_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SaveContentResponse {
            message: "Content saved".to_string(),
            saved_id: bookmark.id,
        }),
    ))
}

/// Lists a user's bookmarks with the underlying content, most recent first.
pub async fn get_saved_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<SavedListResponse>, ApiError> {
    state.store.get_user(user_id).await?;

    let items: Vec<SavedItem> = state
        .store
        .bookmarks_for_user(user_id)
        .await?
        .into_iter()
        .map(|(bookmark, content)| SavedItem {
            saved_id: bookmark.id,
            saved_at: bookmark.saved_at,
            content,
        })
        .collect();

    Ok(Json(SavedListResponse {
        user_id,
        total_saved: items.len(),
        items,
    }))
}

/// Removes a bookmark. The underlying content is untouched.
pub async fn unsave_content_handler(
    State(state): State<Arc<AppState>>,
    Path(saved_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_bookmark(saved_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
