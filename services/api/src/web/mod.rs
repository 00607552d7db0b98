//! services/api/src/web/mod.rs
//!
//! The HTTP layer: handler modules, shared state, and the router.

pub mod feed;
pub mod onboarding;
pub mod rest;
pub mod saved;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod topics;
pub mod users;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use state::AppState;

/// Builds the full API router. The caller layers state, CORS and the
/// documentation UI on top.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(rest::root_handler))
        .route("/health", get(rest::health_handler))
        // Users
        .route("/api/users", post(users::create_user_handler))
        .route("/api/users/{user_id}", get(users::get_user_handler))
        .route("/api/users/{user_id}/topics", get(users::user_topics_handler))
        .route(
            "/api/users/{user_id}/topics/{topic_id}",
            post(users::link_topic_handler).delete(users::unlink_topic_handler),
        )
        // Onboarding
        .route("/api/onboarding", post(onboarding::process_onboarding_handler))
        // Feed
        .route("/api/feed/{user_id}", get(feed::get_feed_handler))
        .route("/api/feed/refresh/{user_id}", post(feed::refresh_feed_handler))
        .route(
            "/api/feed/refresh/{user_id}/topic/{topic_id}",
            post(feed::refresh_topic_handler),
        )
        // Saved content. GET takes a user id, DELETE a bookmark id.
        .route("/api/saved", post(saved::save_content_handler))
        .route(
            "/api/saved/{id}",
            get(saved::get_saved_handler).delete(saved::unsave_content_handler),
        )
        // Settings
        .route(
            "/api/settings/{user_id}",
            get(settings::get_settings_handler).put(settings::update_settings_handler),
        )
        // Topic administration
        .route(
            "/api/topics/{topic_id}",
            put(topics::update_topic_handler).delete(topics::delete_topic_handler),
        )
        // Scheduler
        .route("/api/scheduler/status", get(scheduler::scheduler_status_handler))
        .route("/api/scheduler/trigger/fetch", post(scheduler::trigger_fetch_handler))
        .route(
            "/api/scheduler/trigger/cleanup",
            post(scheduler::trigger_cleanup_handler),
        )
}
