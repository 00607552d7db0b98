//! services/api/src/web/onboarding.rs
//!
//! The onboarding endpoint: accepts either a typed topic submission or
//! free-form interest text and hands it to the master agent.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use curator_core::domain::Topic;
use serde::{Deserialize, Serialize};

use crate::agents::master::{is_legacy_form, parse_legacy_submission, validate_topic_name};
use crate::agents::{MasterAgent, OnboardingOutcome, TopicSubmission};
use crate::error::ApiError;
use crate::web::state::AppState;

/// The two accepted input shapes. A typed `topic` object is preferred;
/// `interests` carries free text (or the legacy delimiter-separated form).
#[derive(Deserialize)]
#[serde(untagged)]
pub enum OnboardingInput {
    Topic { topic: TopicSubmission },
    Interests { interests: String },
}

#[derive(Deserialize)]
pub struct OnboardingRequest {
    pub user_id: i64,
    #[serde(flatten)]
    pub input: OnboardingInput,
}

#[derive(Serialize)]
pub struct OnboardingResponse {
    pub message: String,
    pub topics_added: Vec<Topic>,
    pub topics_linked: Vec<String>,
}

pub async fn process_onboarding_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OnboardingRequest>,
) -> Result<Json<OnboardingResponse>, ApiError> {
    let user = state.store.get_user(payload.user_id).await?;
    let agent = MasterAgent::new(state.store.clone(), state.gateway.clone());

    let outcome = match payload.input {
        OnboardingInput::Topic { topic } => submit(&agent, user.id, topic).await?,
        OnboardingInput::Interests { interests } => {
            let interests = interests.trim();
            if interests.is_empty() {
                return Err(ApiError::Validation(
                    "interests must not be empty".to_string(),
                ));
            }
            if is_legacy_form(interests) {
                let submission = parse_legacy_submission(interests);
                // The raw form text is still recorded verbatim.
                state.store.record_interest(user.id, interests).await?;
                submit(&agent, user.id, submission).await?
            } else {
                agent.process_interests(user.id, interests).await?
            }
        }
    };

    let message = if outcome.topics_added.is_empty() && outcome.topics_linked.is_empty() {
        "No new topics were added".to_string()
    } else {
        format!(
            "Successfully set up {} topic(s)",
            outcome.topics_added.len().max(outcome.topics_linked.len())
        )
    };

    Ok(Json(OnboardingResponse {
        message,
        topics_added: outcome.topics_added,
        topics_linked: outcome.topics_linked,
    }))
}

async fn submit(
    agent: &MasterAgent,
    user_id: i64,
    submission: TopicSubmission,
) -> Result<OnboardingOutcome, ApiError> {
    let submission = TopicSubmission {
        name: submission.name.trim().to_string(),
        details: submission.details.trim().to_string(),
        ..submission
    };
    if !validate_topic_name(&submission.name) {
        return Err(ApiError::Validation(format!(
            "'{}' is not a valid topic name",
            submission.name
        )));
    }
    Ok(agent.process_submission(user_id, submission).await?)
}
