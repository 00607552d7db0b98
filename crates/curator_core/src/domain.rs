//! crates/curator_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP layer; the
//! serde derives exist so adapters and handlers can map them directly.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

//=========================================================================================
// Enumerations
//=========================================================================================

/// The strategy family used to produce content for a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    /// Curated web articles found by the gateway's web search.
    Internet,
    /// A single generated report per fetch.
    Ai,
}

impl FeedSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internet => "internet",
            Self::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "internet" => Some(Self::Internet),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// Whether a topic is a recurring feed or a fixed-length curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicType {
    Feed,
    Learning,
}

impl TopicType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Learning => "learning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "feed" => Some(Self::Feed),
            "learning" => Some(Self::Learning),
            _ => None,
        }
    }
}

/// Delivery / fetch cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

//=========================================================================================
// Per-Topic Agent Configuration
//=========================================================================================

/// Extensible per-topic fetch configuration.
///
/// The named fields cover the knobs the workers actually read; anything
/// not yet promoted to a first-class field lands in `extra` so new knobs
/// never require a schema migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "AgentConfig::default_frequency")]
    pub fetch_frequency: Frequency,
    #[serde(default = "AgentConfig::default_max_items")]
    pub max_items_per_fetch: u32,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_period_days: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AgentConfig {
    fn default_frequency() -> Frequency {
        Frequency::Daily
    }

    fn default_max_items() -> u32 {
        5
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            fetch_frequency: Frequency::Daily,
            max_items_per_fetch: 5,
            sources: Vec::new(),
            keywords: Vec::new(),
            created_by: String::new(),
            learning_period_days: None,
            extra: BTreeMap::new(),
        }
    }
}

//=========================================================================================
// Persistent Entities
//=========================================================================================

/// Represents a registered user.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// One verbatim free-text interest submission, recorded before parsing.
#[derive(Debug, Clone, Serialize)]
pub struct InterestRecord {
    pub id: i64,
    pub user_id: i64,
    pub interest_text: String,
    pub created_at: DateTime<Utc>,
}

/// A named subject of curation, shared across users.
#[derive(Debug, Clone, Serialize)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub feed_source: FeedSource,
    pub topic_type: TopicType,
    /// Total lesson count for learning topics.
    pub learning_period_days: Option<i64>,
    /// 1-based next lesson to generate. Only meaningful for learning topics.
    pub current_day: Option<i64>,
    pub is_completed: bool,
    pub agent_config: AgentConfig,
    pub created_at: DateTime<Utc>,
    pub last_fetched: Option<DateTime<Utc>>,
}

/// One fetched or generated unit of content belonging to a topic.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    pub id: i64,
    pub topic_id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
}

/// Links a user to a content item they saved.
#[derive(Debug, Clone, Serialize)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub content_id: i64,
    pub saved_at: DateTime<Utc>,
}

/// One-per-user delivery preferences, lazily created with defaults.
#[derive(Debug, Clone, Serialize)]
pub struct UserSettings {
    pub user_id: i64,
    pub frequency: Frequency,
    pub preferred_languages: Vec<String>,
    pub delivery_time: NaiveTime,
}

impl UserSettings {
    pub fn defaults_for(user_id: i64) -> Self {
        Self {
            user_id,
            frequency: Frequency::Daily,
            preferred_languages: vec!["en".to_string()],
            delivery_time: NaiveTime::from_hms_opt(6, 0, 0).expect("valid default time"),
        }
    }
}

//=========================================================================================
// Write Models
//=========================================================================================

/// Input for creating a topic.
#[derive(Debug, Clone)]
pub struct NewTopic {
    pub name: String,
    pub description: String,
    pub feed_source: FeedSource,
    pub topic_type: TopicType,
    pub learning_period_days: Option<i64>,
    pub agent_config: AgentConfig,
}

/// Partial update for an existing topic. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub feed_source: Option<FeedSource>,
    pub learning_period_days: Option<i64>,
}

/// Full replacement of a user's settings.
#[derive(Debug, Clone)]
pub struct SettingsUpdate {
    pub frequency: Frequency,
    pub preferred_languages: Vec<String>,
    pub delivery_time: NaiveTime,
}

/// Input for inserting one content item.
#[derive(Debug, Clone)]
pub struct NewContentItem {
    pub topic_id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
}

//=========================================================================================
// Gateway Payloads
//=========================================================================================

/// One topic candidate extracted from free-text interests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopicCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One curated web article returned by the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FetchedItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source: String,
}

/// One generated report or lesson returned by the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
}
