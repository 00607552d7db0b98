//! services/api/src/web/settings.rs
//!
//! Per-user delivery preference handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use chrono::NaiveTime;
use curator_core::domain::{Frequency, SettingsUpdate, UserSettings};
use serde::Deserialize;

use crate::error::ApiError;
use crate::web::state::AppState;

#[derive(Deserialize)]
pub struct SettingsPayload {
    pub periodic_frequency: String,
    pub preferred_languages: Vec<String>,
    /// `HH:MM:SS` or `HH:MM`.
    pub delivery_time: String,
}

/// Returns the user's settings, creating the default row on first read.
pub async fn get_settings_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserSettings>, ApiError> {
    state.store.get_user(user_id).await?;
    Ok(Json(state.store.get_or_create_settings(user_id).await?))
}

/// Replaces the user's settings wholesale.
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(payload): Json<SettingsPayload>,
) -> Result<Json<UserSettings>, ApiError> {
    state.store.get_user(user_id).await?;

    let frequency = Frequency::parse(&payload.periodic_frequency).ok_or_else(|| {
        ApiError::Validation(format!(
            "'{}' is not a valid frequency",
            payload.periodic_frequency
        ))
    })?;

    let delivery_time = NaiveTime::parse_from_str(&payload.delivery_time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&payload.delivery_time, "%H:%M"))
        .map_err(|_| {
            ApiError::Validation(format!(
                "'{}' is not a valid delivery time (expected HH:MM:SS)",
                payload.delivery_time
            ))
        })?;

    if payload.preferred_languages.is_empty() {
        return Err(ApiError::Validation(
            "preferred_languages must not be empty".to_string(),
        ));
    }

    let settings = state
        .store
        .update_settings(
            user_id,
            SettingsUpdate {
                frequency,
                preferred_languages: payload.preferred_languages,
                delivery_time,
            },
        )
        .await?;

    Ok(Json(settings))
}
