//! crates/curator_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or LLM APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Bookmark, ContentItem, FetchedItem, GeneratedItem, InterestRecord, NewContentItem, NewTopic,
    SettingsUpdate, Topic, TopicCandidate, TopicUpdate, User, UserSettings,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Content Store Port
//=========================================================================================

/// Relational persistence for users, topics, content, bookmarks and settings.
#[async_trait]
pub trait ContentStore: Send + Sync {
    // --- Users ---
    async fn create_user(&self, name: &str, email: &str) -> PortResult<User>;

    async fn get_user(&self, user_id: i64) -> PortResult<User>;

    /// Persists a raw free-text interest submission before any parsing happens.
    async fn record_interest(&self, user_id: i64, interest_text: &str)
        -> PortResult<InterestRecord>;

    // --- Topics ---
    async fn create_topic(&self, new_topic: NewTopic) -> PortResult<Topic>;

    async fn get_topic(&self, topic_id: i64) -> PortResult<Topic>;

    /// Exact, case-sensitive lookup used as the onboarding dedup key.
    async fn get_topic_by_name(&self, name: &str) -> PortResult<Option<Topic>>;

    async fn list_topics(&self) -> PortResult<Vec<Topic>>;

    async fn topics_for_user(&self, user_id: i64) -> PortResult<Vec<Topic>>;

    async fn update_topic(&self, topic_id: i64, update: TopicUpdate) -> PortResult<Topic>;

    /// Deletes a topic; content and user links cascade.
    async fn delete_topic(&self, topic_id: i64) -> PortResult<()>;

    /// Links a topic to a user. Returns `false` if the link already existed.
    async fn link_topic_to_user(&self, user_id: i64, topic_id: i64) -> PortResult<bool>;

    /// Removes a user↔topic link. Returns `false` if no link existed.
    async fn unlink_topic_from_user(&self, user_id: i64, topic_id: i64) -> PortResult<bool>;

    async fn is_topic_linked(&self, user_id: i64, topic_id: i64) -> PortResult<bool>;

    // --- Fetch State ---
    async fn mark_topic_fetched(&self, topic_id: i64, at: DateTime<Utc>) -> PortResult<()>;

    /// Advances a learning topic's progress and fetch timestamp in one update.
    async fn advance_learning_progress(
        &self,
        topic_id: i64,
        next_day: i64,
        completed: bool,
        at: DateTime<Utc>,
    ) -> PortResult<()>;

    // --- Content ---
    /// Inserts a batch of content items inside a single transaction.
    /// Either all rows land or none do.
    async fn insert_content(&self, items: Vec<NewContentItem>) -> PortResult<u64>;

    async fn get_content(&self, content_id: i64) -> PortResult<ContentItem>;

    /// Most-recent-first content for a topic.
    async fn recent_content(&self, topic_id: i64, limit: i64) -> PortResult<Vec<ContentItem>>;

    /// Content whose fetch timestamp falls within `[start, end]`, most recent first.
    async fn content_between(
        &self,
        topic_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> PortResult<Vec<ContentItem>>;

    /// Hard-deletes content strictly older than `cutoff`; returns the count deleted.
    /// A row stamped exactly at the cutoff is retained.
    async fn delete_content_before(&self, topic_id: i64, cutoff: DateTime<Utc>)
        -> PortResult<u64>;

    // --- Bookmarks ---
    /// Saves a bookmark. Returns `Conflict` if the pair is already saved.
    async fn save_bookmark(&self, user_id: i64, content_id: i64) -> PortResult<Bookmark>;

    async fn bookmarks_for_user(&self, user_id: i64)
        -> PortResult<Vec<(Bookmark, ContentItem)>>;

    async fn delete_bookmark(&self, bookmark_id: i64) -> PortResult<()>;

    // --- Settings ---
    /// Returns the user's settings, creating the default row on first read.
    async fn get_or_create_settings(&self, user_id: i64) -> PortResult<UserSettings>;

    async fn update_settings(
        &self,
        user_id: i64,
        update: SettingsUpdate,
    ) -> PortResult<UserSettings>;
}

//=========================================================================================
// LLM Gateway Port
//=========================================================================================

/// The external LLM service performing interest parsing and content production.
///
/// All operations are fallible and rate-limited. Implementations must tolerate
/// the model wrapping its answer in extraneous formatting: a malformed payload
/// decodes to "no result" rather than a hard error, while transport failures
/// surface as `PortError`.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Extracts an ordered list of `(name, description)` topic candidates
    /// from free-form interest text.
    async fn parse_interests(&self, interest_text: &str) -> PortResult<Vec<TopicCandidate>>;

    /// Curates up to `max_items` recent web articles for a topic.
    async fn fetch_content_for_topic(
        &self,
        topic_name: &str,
        description: &str,
        max_items: u32,
    ) -> PortResult<Vec<FetchedItem>>;

    /// Generates one time-aware report for a feed topic.
    async fn generate_ai_content(
        &self,
        topic_name: &str,
        description: &str,
        time_period: &str,
        current_date: &str,
    ) -> PortResult<Option<GeneratedItem>>;

    /// Generates one day-by-day curriculum lesson for a learning topic.
    async fn generate_learning_content(
        &self,
        topic_name: &str,
        description: &str,
        current_day: i64,
        total_days: i64,
        previous_context: &str,
    ) -> PortResult<Option<GeneratedItem>>;
}
