//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use curator_core::ports::{ContentStore, LlmGateway};

use crate::config::Config;
use crate::scheduler::ContentScheduler;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub gateway: Arc<dyn LlmGateway>,
    pub config: Arc<Config>,
    pub scheduler: Arc<ContentScheduler>,
}
