//! services/api/src/agents/master.rs
//!
//! The master agent orchestrates onboarding: it turns raw interest text or a
//! structured topic submission into topic records, deduplicating by name and
//! linking topics to the requesting user.

use std::sync::Arc;

use curator_core::domain::{AgentConfig, FeedSource, NewTopic, Topic, TopicType};
use curator_core::ports::{ContentStore, LlmGateway, PortResult};
use serde::Deserialize;
use tracing::{info, warn};

//=========================================================================================
// Topic Name Validation
//=========================================================================================

const TOPIC_NAME_MIN: usize = 2;
const TOPIC_NAME_MAX: usize = 100;

/// Checks whether a topic name is acceptable: non-empty, 2-100 characters,
/// composed only of letters, digits, spaces, hyphens, ampersands and apostrophes.
pub fn validate_topic_name(name: &str) -> bool {
    let len = name.chars().count();
    if len < TOPIC_NAME_MIN || len > TOPIC_NAME_MAX {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '&' | '\''))
}

//=========================================================================================
// Structured Topic Submission
//=========================================================================================

/// A typed onboarding submission for a single topic.
///
/// This is the preferred client contract; the legacy delimiter-separated form
/// string is still accepted through [`parse_legacy_submission`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopicSubmission {
    pub name: String,
    #[serde(default)]
    pub details: String,
    #[serde(default = "TopicSubmission::default_topic_type")]
    pub topic_type: TopicType,
    #[serde(default)]
    pub feed_source: Option<FeedSource>,
    #[serde(default)]
    pub learning_period_days: Option<i64>,
}

impl TopicSubmission {
    fn default_topic_type() -> TopicType {
        TopicType::Feed
    }

    /// The effective feed source: learning topics always use the AI source,
    /// feed topics default to the internet.
    pub fn effective_feed_source(&self) -> FeedSource {
        match self.topic_type {
            TopicType::Learning => FeedSource::Ai,
            TopicType::Feed => self.feed_source.unwrap_or(FeedSource::Internet),
        }
    }
}

/// Field labels recognized by the legacy form format.
const LEGACY_LABELS: [&str; 5] = [
    "Topic Type:",
    "Feed Source:",
    "Learning Period:",
    "Language:",
    "Schedule:",
];

/// Returns true if interest text looks like the legacy delimiter-separated
/// form submission rather than natural language.
pub fn is_legacy_form(text: &str) -> bool {
    LEGACY_LABELS.iter().any(|label| text.contains(label))
}

/// Parses the legacy `". "`-delimited form string.
///
/// Format: `"Topic Name. Details. Language: X. Schedule: Y. Topic Type: feed|learning.
/// Feed Source: internet|ai. Learning Period: 30 days"`. Segments that match no
/// recognized label are rejoined as the description. The learning period is
/// extracted digits-only, so `"30 days"` and `"30"` both parse to 30.
pub fn parse_legacy_submission(text: &str) -> TopicSubmission {
    let parts: Vec<&str> = text.split(". ").collect();
    let name = parts.first().map(|p| p.trim()).unwrap_or("").to_string();

    let mut topic_type = TopicType::Feed;
    let mut feed_source = None;
    let mut learning_period_days = None;
    let mut detail_parts = Vec::new();

    for part in parts.iter().skip(1) {
        if let Some(value) = part.split("Topic Type:").nth(1) {
            if let Some(parsed) = TopicType::parse(value.trim().trim_end_matches('.')) {
                topic_type = parsed;
            }
        } else if let Some(value) = part.split("Feed Source:").nth(1) {
            feed_source = FeedSource::parse(value.trim().trim_end_matches('.'));
        } else if let Some(value) = part.split("Learning Period:").nth(1) {
            let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
            learning_period_days = digits.parse::<i64>().ok();
        } else if !LEGACY_LABELS.iter().any(|label| part.contains(label)) {
            detail_parts.push(part.trim().trim_end_matches('.'));
        }
    }

    TopicSubmission {
        name,
        details: detail_parts.join(". "),
        topic_type,
        feed_source,
        learning_period_days,
    }
}

//=========================================================================================
// The Master Agent
//=========================================================================================

/// The outcome of one onboarding call.
#[derive(Debug, Default)]
pub struct OnboardingOutcome {
    /// Topics newly created by this call (not ones merely re-linked).
    pub topics_added: Vec<Topic>,
    /// Topic names newly linked to the user by this call.
    pub topics_linked: Vec<String>,
}

pub struct MasterAgent {
    store: Arc<dyn ContentStore>,
    gateway: Arc<dyn LlmGateway>,
}

impl MasterAgent {
    pub fn new(store: Arc<dyn ContentStore>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self { store, gateway }
    }

    /// Processes free-form interest text for a user.
    ///
    /// The raw input is persisted verbatim before any parsing, so it survives
    /// a downstream failure. Candidates with invalid names are skipped; valid
    /// names are deduplicated case-sensitively against existing topics.
    /// Replaying the same input never duplicates topics or links.
    pub async fn process_interests(
        &self,
        user_id: i64,
        interest_text: &str,
    ) -> PortResult<OnboardingOutcome> {
        self.store.record_interest(user_id, interest_text).await?;

        let candidates = self.gateway.parse_interests(interest_text).await?;
        let mut outcome = OnboardingOutcome::default();

        for candidate in candidates {
            let name = candidate.name.trim();
            let description = candidate.description.trim();

            if !validate_topic_name(name) {
                warn!(name, "Skipping invalid topic name from interest parsing");
                continue;
            }

            let topic = match self.store.get_topic_by_name(name).await? {
                Some(existing) => existing,
                None => {
                    let topic = self
                        .store
                        .create_topic(NewTopic {
                            name: name.to_string(),
                            description: description.to_string(),
                            feed_source: FeedSource::Internet,
                            topic_type: TopicType::Feed,
                            learning_period_days: None,
                            agent_config: default_agent_config(name, None, "master_agent"),
                        })
                        .await?;
                    info!(name, "Created new topic");
                    outcome.topics_added.push(topic.clone());
                    topic
                }
            };

            if self.store.link_topic_to_user(user_id, topic.id).await? {
                info!(name = %topic.name, user_id, "Linked topic to user");
                outcome.topics_linked.push(topic.name.clone());
            }
        }

        Ok(outcome)
    }

    /// Processes a structured single-topic submission.
    ///
    /// The caller is responsible for validating the topic name first.
    pub async fn process_submission(
        &self,
        user_id: i64,
        submission: TopicSubmission,
    ) -> PortResult<OnboardingOutcome> {
        let feed_source = submission.effective_feed_source();
        let learning_period = match submission.topic_type {
            TopicType::Learning => submission.learning_period_days,
            TopicType::Feed => None,
        };

        let mut outcome = OnboardingOutcome::default();

        let topic = match self.store.get_topic_by_name(&submission.name).await? {
            Some(existing) => existing,
            None => {
                let topic = self
                    .store
                    .create_topic(NewTopic {
                        name: submission.name.clone(),
                        description: submission.details.clone(),
                        feed_source,
                        topic_type: submission.topic_type,
                        learning_period_days: learning_period,
                        agent_config: default_agent_config(
                            &submission.name,
                            learning_period,
                            "user_form",
                        ),
                    })
                    .await?;
                info!(name = %topic.name, "Created new topic from form submission");
                outcome.topics_added.push(topic.clone());
                topic
            }
        };

        if self.store.link_topic_to_user(user_id, topic.id).await? {
            outcome.topics_linked.push(topic.name.clone());
        }

        Ok(outcome)
    }
}

/// Default worker configuration for a freshly created topic: daily cadence,
/// five-item cap, keyword seeded from the lower-cased topic name.
fn default_agent_config(
    topic_name: &str,
    learning_period_days: Option<i64>,
    created_by: &str,
) -> AgentConfig {
    AgentConfig {
        keywords: vec![topic_name.to_lowercase()],
        created_by: created_by.to_string(),
        learning_period_days,
        ..AgentConfig::default()
    }
}

//=========================================================================================
// Tests
//=========================================================================================
