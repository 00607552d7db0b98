//! services/api/src/test_support.rs
//!
//! Shared fixtures for the service's unit tests: an in-memory SQLite store
//! with migrations applied, and a canned in-process gateway.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use curator_core::domain::{
    FeedSource, FetchedItem, GeneratedItem, NewTopic, Topic, TopicCandidate, TopicType,
};
use curator_core::ports::{ContentStore, LlmGateway, PortError, PortResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::adapters::DbAdapter;

/// Builds a fresh in-memory database with all migrations applied.
///
/// The pool is capped at one connection so every query sees the same
/// `:memory:` database.
pub async fn memory_store() -> Arc<DbAdapter> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("in-memory sqlite options")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect to in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Arc::new(DbAdapter::new(pool))
}

/// Creates and returns a feed topic backed by the internet source.
pub async fn seed_internet_topic(store: &dyn ContentStore, name: &str) -> Topic {
    store
        .create_topic(NewTopic {
            name: name.to_string(),
            description: format!("{name} coverage"),
            feed_source: FeedSource::Internet,
            topic_type: TopicType::Feed,
            learning_period_days: None,
            agent_config: Default::default(),
        })
        .await
        .expect("create internet topic")
}

/// Creates and returns a feed topic backed by the AI source.
pub async fn seed_ai_topic(store: &dyn ContentStore, name: &str) -> Topic {
    store
        .create_topic(NewTopic {
            name: name.to_string(),
            description: format!("{name} reports"),
            feed_source: FeedSource::Ai,
            topic_type: TopicType::Feed,
            learning_period_days: None,
            agent_config: Default::default(),
        })
        .await
        .expect("create ai topic")
}

/// Creates and returns a learning topic with the given period.
pub async fn seed_learning_topic(store: &dyn ContentStore, name: &str, days: i64) -> Topic {
    store
        .create_topic(NewTopic {
            name: name.to_string(),
            description: format!("learn {name}"),
            feed_source: FeedSource::Ai,
            topic_type: TopicType::Learning,
            learning_period_days: Some(days),
            agent_config: Default::default(),
        })
        .await
        .expect("create learning topic")
}

/// A canned `LlmGateway` for tests. Returns configured payloads, optionally
/// failing the transport globally or for a single topic name.
#[derive(Default)]
pub struct MockGateway {
    pub candidates: Vec<TopicCandidate>,
    pub items: Vec<FetchedItem>,
    pub generated: Option<GeneratedItem>,
    /// Fail every call with a transport error.
    pub fail: bool,
    /// Fail only calls naming this topic.
    pub fail_for: Option<String>,
    pub calls: AtomicUsize,
}

impl MockGateway {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate(&self, topic_name: &str) -> PortResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PortError::Unexpected("gateway transport down".to_string()));
        }
        if self.fail_for.as_deref() == Some(topic_name) {
            return Err(PortError::Unexpected(format!(
                "gateway refused topic {topic_name}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LlmGateway for MockGateway {
    async fn parse_interests(&self, _interest_text: &str) -> PortResult<Vec<TopicCandidate>> {
        self.gate("")?;
        Ok(self.candidates.clone())
    }

    async fn fetch_content_for_topic(
        &self,
        topic_name: &str,
        _description: &str,
        max_items: u32,
    ) -> PortResult<Vec<FetchedItem>> {
        self.gate(topic_name)?;
        let mut items = self.items.clone();
        items.truncate(max_items as usize);
        Ok(items)
    }

    async fn generate_ai_content(
        &self,
        topic_name: &str,
        _description: &str,
        _time_period: &str,
        _current_date: &str,
    ) -> PortResult<Option<GeneratedItem>> {
        self.gate(topic_name)?;
        Ok(self.generated.clone())
    }

    async fn generate_learning_content(
        &self,
        topic_name: &str,
        _description: &str,
        current_day: i64,
        total_days: i64,
        _previous_context: &str,
    ) -> PortResult<Option<GeneratedItem>> {
        self.gate(topic_name)?;
        Ok(self.generated.clone().map(|mut lesson| {
            if lesson.title.is_empty() {
                lesson.title = format!("Day {current_day} of {total_days}");
            }
            lesson
        }))
    }
}

/// A fetched item with all optional fields populated.
pub fn fetched_item(title: &str) -> FetchedItem {
    FetchedItem {
        title: title.to_string(),
        summary: format!("{title} summary"),
        content: format!("{title} body"),
        url: Some(format!("https://example.com/{}", title.to_lowercase())),
        image_url: None,
        source: "Example Wire".to_string(),
    }
}

/// A generated item with the given title.
pub fn generated_item(title: &str) -> GeneratedItem {
    GeneratedItem {
        title: title.to_string(),
        summary: format!("{title} summary"),
        content: format!("{title} body"),
    }
}
