//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ContentStore` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use curator_core::domain::{
    Bookmark, ContentItem, FeedSource, InterestRecord, NewContentItem, NewTopic, SettingsUpdate,
    Topic, TopicType, TopicUpdate, User, UserSettings,
};
use curator_core::ports::{ContentStore, PortError, PortResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ContentStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter` from an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the SQLite database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct InterestRecordRow {
    id: i64,
    user_id: i64,
    interest_text: String,
    created_at: DateTime<Utc>,
}

impl InterestRecordRow {
    fn to_domain(self) -> InterestRecord {
        InterestRecord {
            id: self.id,
            user_id: self.user_id,
            interest_text: self.interest_text,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct TopicRecord {
    id: i64,
    topic_name: String,
    description: String,
    feed_source: String,
    topic_type: String,
    learning_period_days: Option<i64>,
    current_day: Option<i64>,
    is_completed: bool,
    agent_config: String,
    created_at: DateTime<Utc>,
    last_fetched: Option<DateTime<Utc>>,
}

impl TopicRecord {
    fn to_domain(self) -> Topic {
        Topic {
            id: self.id,
            name: self.topic_name,
            description: self.description,
            feed_source: FeedSource::parse(&self.feed_source).unwrap_or(FeedSource::Internet),
            topic_type: TopicType::parse(&self.topic_type).unwrap_or(TopicType::Feed),
            learning_period_days: self.learning_period_days,
            current_day: self.current_day,
            is_completed: self.is_completed,
            agent_config: serde_json::from_str(&self.agent_config).unwrap_or_default(),
            created_at: self.created_at,
            last_fetched: self.last_fetched,
        }
    }
}

#[derive(FromRow)]
struct ContentRecord {
    id: i64,
    topic_id: i64,
    title: String,
    summary: String,
    content: String,
    url: Option<String>,
    image_url: Option<String>,
    source: String,
    fetched_at: DateTime<Utc>,
}

impl ContentRecord {
    fn to_domain(self) -> ContentItem {
        ContentItem {
            id: self.id,
            topic_id: self.topic_id,
            title: self.title,
            summary: self.summary,
            content: self.content,
            url: self.url,
            image_url: self.image_url,
            source: self.source,
            fetched_at: self.fetched_at,
        }
    }
}

#[derive(FromRow)]
struct BookmarkRecord {
    id: i64,
    user_id: i64,
    content_id: i64,
    saved_at: DateTime<Utc>,
}

impl BookmarkRecord {
    fn to_domain(self) -> Bookmark {
        Bookmark {
            id: self.id,
            user_id: self.user_id,
            content_id: self.content_id,
            saved_at: self.saved_at,
        }
    }
}

/// A bookmark row joined with the content item it points at.
#[derive(FromRow)]
struct SavedRowRecord {
    id: i64,
    user_id: i64,
    content_id: i64,
    saved_at: DateTime<Utc>,
    c_topic_id: i64,
    c_title: String,
    c_summary: String,
    c_content: String,
    c_url: Option<String>,
    c_image_url: Option<String>,
    c_source: String,
    c_fetched_at: DateTime<Utc>,
}

impl SavedRowRecord {
    fn to_domain(self) -> (Bookmark, ContentItem) {
        (
            Bookmark {
                id: self.id,
                user_id: self.user_id,
                content_id: self.content_id,
                saved_at: self.saved_at,
            },
            ContentItem {
                id: self.content_id,
                topic_id: self.c_topic_id,
                title: self.c_title,
                summary: self.c_summary,
                content: self.c_content,
                url: self.c_url,
                image_url: self.c_image_url,
                source: self.c_source,
                fetched_at: self.c_fetched_at,
            },
        )
    }
}

#[derive(FromRow)]
struct SettingsRecord {
    user_id: i64,
    periodic_frequency: String,
    preferred_languages: String,
    delivery_time: String,
}

impl SettingsRecord {
    fn to_domain(self) -> UserSettings {
        let defaults = UserSettings::defaults_for(self.user_id);
        UserSettings {
            user_id: self.user_id,
            frequency: curator_core::domain::Frequency::parse(&self.periodic_frequency)
                .unwrap_or(defaults.frequency),
            preferred_languages: serde_json::from_str(&self.preferred_languages)
                .unwrap_or(defaults.preferred_languages),
            delivery_time: NaiveTime::parse_from_str(&self.delivery_time, "%H:%M:%S")
                .unwrap_or(defaults.delivery_time),
        }
    }
}

const TOPIC_COLUMNS: &str = "id, topic_name, description, feed_source, topic_type, \
     learning_period_days, current_day, is_completed, agent_config, created_at, last_fetched";

const CONTENT_COLUMNS: &str =
    "id, topic_id, title, summary, content, url, image_url, source, fetched_at";

//=========================================================================================
// `ContentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentStore for DbAdapter {
    async fn create_user(&self, name: &str, email: &str) -> PortResult<User> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO users (name, email, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
                    PortError::Conflict(format!("email {} is already registered", email))
                }
                _ => unexpected(e),
            })?;

        self.get_user(result.last_insert_rowid()).await
    }

    async fn get_user(&self, user_id: i64) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;

        Ok(record.to_domain())
    }

    async fn record_interest(
        &self,
        user_id: i64,
        interest_text: &str,
    ) -> PortResult<InterestRecord> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO user_interests (user_id, interest_text, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(interest_text)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let record = sqlx::query_as::<_, InterestRecordRow>(
            "SELECT id, user_id, interest_text, created_at FROM user_interests WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn create_topic(&self, new_topic: NewTopic) -> PortResult<Topic> {
        let now = Utc::now();
        // Learning topics start on day 1; feed topics carry no day counter.
        let current_day = match new_topic.topic_type {
            TopicType::Learning => Some(1i64),
            TopicType::Feed => None,
        };
        let config_json = serde_json::to_string(&new_topic.agent_config)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO topics (topic_name, description, feed_source, topic_type, \
             learning_period_days, current_day, is_completed, agent_config, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&new_topic.name)
        .bind(&new_topic.description)
        .bind(new_topic.feed_source.as_str())
        .bind(new_topic.topic_type.as_str())
        .bind(new_topic.learning_period_days)
        .bind(current_day)
        .bind(config_json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
                PortError::Conflict(format!("topic '{}' already exists", new_topic.name))
            }
            _ => unexpected(e),
        })?;

        self.get_topic(result.last_insert_rowid()).await
    }

    async fn get_topic(&self, topic_id: i64) -> PortResult<Topic> {
        let query = format!("SELECT {} FROM topics WHERE id = ?", TOPIC_COLUMNS);
        let record = sqlx::query_as::<_, TopicRecord>(&query)
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Topic {} not found", topic_id)))?;

        Ok(record.to_domain())
    }

    async fn get_topic_by_name(&self, name: &str) -> PortResult<Option<Topic>> {
        let query = format!("SELECT {} FROM topics WHERE topic_name = ?", TOPIC_COLUMNS);
        let record = sqlx::query_as::<_, TopicRecord>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(record.map(TopicRecord::to_domain))
    }

    async fn list_topics(&self) -> PortResult<Vec<Topic>> {
        let query = format!("SELECT {} FROM topics ORDER BY id", TOPIC_COLUMNS);
        let records = sqlx::query_as::<_, TopicRecord>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(TopicRecord::to_domain).collect())
    }

    async fn topics_for_user(&self, user_id: i64) -> PortResult<Vec<Topic>> {
        let query = "SELECT t.id, t.topic_name, t.description, t.feed_source, t.topic_type, \
             t.learning_period_days, t.current_day, t.is_completed, t.agent_config, \
             t.created_at, t.last_fetched \
             FROM topics t \
             JOIN user_topics ut ON ut.topic_id = t.id \
             WHERE ut.user_id = ? ORDER BY ut.added_at, t.id";
        let records = sqlx::query_as::<_, TopicRecord>(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(TopicRecord::to_domain).collect())
    }

    async fn update_topic(&self, topic_id: i64, update: TopicUpdate) -> PortResult<Topic> {
        let mut topic = self.get_topic(topic_id).await?;

        if let Some(name) = update.name {
            topic.name = name;
        }
        if let Some(description) = update.description {
            topic.description = description;
        }
        if let Some(feed_source) = update.feed_source {
            topic.feed_source = feed_source;
        }
        if let Some(period) = update.learning_period_days {
            topic.learning_period_days = Some(period);
        }

        // Keep the mirror fields inside agent_config in step with the row.
        topic.agent_config.keywords = vec![topic.name.to_lowercase()];
        topic.agent_config.learning_period_days = topic.learning_period_days;

        let config_json = serde_json::to_string(&topic.agent_config)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "UPDATE topics SET topic_name = ?, description = ?, feed_source = ?, \
             learning_period_days = ?, agent_config = ? WHERE id = ?",
        )
        .bind(&topic.name)
        .bind(&topic.description)
        .bind(topic.feed_source.as_str())
        .bind(topic.learning_period_days)
        .bind(config_json)
        .bind(topic_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
                PortError::Conflict(format!("topic '{}' already exists", topic.name))
            }
            _ => unexpected(e),
        })?;

        Ok(topic)
    }

    async fn delete_topic(&self, topic_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Topic {} not found", topic_id)));
        }
        Ok(())
    }

    async fn link_topic_to_user(&self, user_id: i64, topic_id: i64) -> PortResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_topics (user_id, topic_id, added_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(topic_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(result.rows_affected() > 0)
    }

    async fn unlink_topic_from_user(&self, user_id: i64, topic_id: i64) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM user_topics WHERE user_id = ? AND topic_id = ?")
            .bind(user_id)
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_topic_linked(&self, user_id: i64, topic_id: i64) -> PortResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_topics WHERE user_id = ? AND topic_id = ?",
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(count > 0)
    }

    async fn mark_topic_fetched(&self, topic_id: i64, at: DateTime<Utc>) -> PortResult<()> {
        sqlx::query("UPDATE topics SET last_fetched = ? WHERE id = ?")
            .bind(at)
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn advance_learning_progress(
        &self,
        topic_id: i64,
        next_day: i64,
        completed: bool,
        at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "UPDATE topics SET current_day = ?, is_completed = ?, last_fetched = ? WHERE id = ?",
        )
        .bind(next_day)
        .bind(completed)
        .bind(at)
        .bind(topic_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn insert_content(&self, items: Vec<NewContentItem>) -> PortResult<u64> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut inserted = 0u64;

        for item in &items {
            sqlx::query(
                "INSERT INTO content_pool \
                 (topic_id, title, summary, content, url, image_url, source, fetched_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(item.topic_id)
            .bind(&item.title)
            .bind(&item.summary)
            .bind(&item.content)
            .bind(&item.url)
            .bind(&item.image_url)
            .bind(&item.source)
            .bind(item.fetched_at)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
            inserted += 1;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(inserted)
    }

    async fn get_content(&self, content_id: i64) -> PortResult<ContentItem> {
        let query = format!("SELECT {} FROM content_pool WHERE id = ?", CONTENT_COLUMNS);
        let record = sqlx::query_as::<_, ContentRecord>(&query)
            .bind(content_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Content {} not found", content_id)))?;

        Ok(record.to_domain())
    }

    async fn recent_content(&self, topic_id: i64, limit: i64) -> PortResult<Vec<ContentItem>> {
        let query = format!(
            "SELECT {} FROM content_pool WHERE topic_id = ? \
             ORDER BY fetched_at DESC, id DESC LIMIT ?",
            CONTENT_COLUMNS
        );
        let records = sqlx::query_as::<_, ContentRecord>(&query)
            .bind(topic_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(ContentRecord::to_domain).collect())
    }

    async fn content_between(
        &self,
        topic_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> PortResult<Vec<ContentItem>> {
        let query = format!(
            "SELECT {} FROM content_pool \
             WHERE topic_id = ? AND fetched_at >= ? AND fetched_at <= ? \
             ORDER BY fetched_at DESC, id DESC LIMIT ?",
            CONTENT_COLUMNS
        );
        let records = sqlx::query_as::<_, ContentRecord>(&query)
            .bind(topic_id)
            .bind(start)
            .bind(end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(ContentRecord::to_domain).collect())
    }

    async fn delete_content_before(
        &self,
        topic_id: i64,
        cutoff: DateTime<Utc>,
    ) -> PortResult<u64> {
        let result =
            sqlx::query("DELETE FROM content_pool WHERE topic_id = ? AND fetched_at < ?")
                .bind(topic_id)
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;

        Ok(result.rows_affected())
    }

    async fn save_bookmark(&self, user_id: i64, content_id: i64) -> PortResult<Bookmark> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO saved_content (user_id, content_id, saved_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(content_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
                PortError::Conflict("Content already saved".to_string())
            }
            _ => unexpected(e),
        })?;

        let record = sqlx::query_as::<_, BookmarkRecord>(
            "SELECT id, user_id, content_id, saved_at FROM saved_content WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn bookmarks_for_user(
        &self,
        user_id: i64,
    ) -> PortResult<Vec<(Bookmark, ContentItem)>> {
        let records = sqlx::query_as::<_, SavedRowRecord>(
            "SELECT s.id, s.user_id, s.content_id, s.saved_at, \
             c.topic_id AS c_topic_id, c.title AS c_title, c.summary AS c_summary, \
             c.content AS c_content, c.url AS c_url, c.image_url AS c_image_url, \
             c.source AS c_source, c.fetched_at AS c_fetched_at \
             FROM saved_content s \
             JOIN content_pool c ON c.id = s.content_id \
             WHERE s.user_id = ? ORDER BY s.saved_at DESC, s.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(SavedRowRecord::to_domain).collect())
    }

    async fn delete_bookmark(&self, bookmark_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM saved_content WHERE id = ?")
            .bind(bookmark_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Saved content {} not found",
                bookmark_id
            )));
        }
        Ok(())
    }

    async fn get_or_create_settings(&self, user_id: i64) -> PortResult<UserSettings> {
        let record = sqlx::query_as::<_, SettingsRecord>(
            "SELECT user_id, periodic_frequency, preferred_languages, delivery_time \
             FROM user_settings WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        if let Some(record) = record {
            return Ok(record.to_domain());
        }

        let defaults = UserSettings::defaults_for(user_id);
        sqlx::query(
            "INSERT INTO user_settings (user_id, periodic_frequency, preferred_languages, \
             delivery_time) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(defaults.frequency.as_str())
        .bind(serde_json::to_string(&defaults.preferred_languages).unwrap_or_default())
        .bind(defaults.delivery_time.format("%H:%M:%S").to_string())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(defaults)
    }

    async fn update_settings(
        &self,
        user_id: i64,
        update: SettingsUpdate,
    ) -> PortResult<UserSettings> {
        let languages = serde_json::to_string(&update.preferred_languages)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO user_settings (user_id, periodic_frequency, preferred_languages, \
             delivery_time) VALUES (?, ?, ?, ?) \
             ON CONFLICT (user_id) DO UPDATE SET \
             periodic_frequency = excluded.periodic_frequency, \
             preferred_languages = excluded.preferred_languages, \
             delivery_time = excluded.delivery_time",
        )
        .bind(user_id)
        .bind(update.frequency.as_str())
        .bind(languages)
        .bind(update.delivery_time.format("%H:%M:%S").to_string())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(UserSettings {
            user_id,
            frequency: update.frequency,
            preferred_languages: update.preferred_languages,
            delivery_time: update.delivery_time,
        })
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_store, seed_internet_topic, seed_learning_topic};
    use curator_core::domain::Frequency;

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = memory_store().await;
        store.create_user("Asha", "asha@example.com").await.unwrap();

        let err = store
            .create_user("Other", "asha@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn learning_topics_start_on_day_one() {
        let store = memory_store().await;
        let learning = seed_learning_topic(store.as_ref(), "Chess", 30).await;
        let feed = seed_internet_topic(store.as_ref(), "Tech News").await;

        assert_eq!(learning.current_day, Some(1));
        assert_eq!(feed.current_day, None);
        assert!(feed.last_fetched.is_none());
    }

    #[tokio::test]
    async fn topic_name_lookup_is_case_sensitive() {
        let store = memory_store().await;
        seed_internet_topic(store.as_ref(), "Tech News").await;

        assert!(store.get_topic_by_name("Tech News").await.unwrap().is_some());
        assert!(store.get_topic_by_name("tech news").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn relinking_a_topic_is_a_no_op() {
        let store = memory_store().await;
        let user = store.create_user("Asha", "asha@example.com").await.unwrap();
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;

        assert!(store.link_topic_to_user(user.id, topic.id).await.unwrap());
        assert!(!store.link_topic_to_user(user.id, topic.id).await.unwrap());
        assert!(store.unlink_topic_from_user(user.id, topic.id).await.unwrap());
        assert!(!store.unlink_topic_from_user(user.id, topic.id).await.unwrap());
    }

    #[tokio::test]
    async fn topic_update_refreshes_config_mirrors() {
        let store = memory_store().await;
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;

        let updated = store
            .update_topic(
                topic.id,
                TopicUpdate {
                    name: Some("Gadget Watch".to_string()),
                    ..TopicUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Gadget Watch");
        assert_eq!(updated.agent_config.keywords, vec!["gadget watch".to_string()]);
    }

    #[tokio::test]
    async fn deleting_a_topic_cascades_to_content_and_links() {
        let store = memory_store().await;
        let user = store.create_user("Asha", "asha@example.com").await.unwrap();
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;
        store.link_topic_to_user(user.id, topic.id).await.unwrap();
        store
            .insert_content(vec![NewContentItem {
                topic_id: topic.id,
                title: "x".to_string(),
                summary: String::new(),
                content: String::new(),
                url: None,
                image_url: None,
                source: "test".to_string(),
                fetched_at: Utc::now(),
            }])
            .await
            .unwrap();

        store.delete_topic(topic.id).await.unwrap();

        assert!(matches!(
            store.get_topic(topic.id).await.unwrap_err(),
            PortError::NotFound(_)
        ));
        assert!(store.recent_content(topic.id, 10).await.unwrap().is_empty());
        assert!(store.topics_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_to_an_existing_topic_name_is_a_conflict() {
        let store = memory_store().await;
        seed_internet_topic(store.as_ref(), "Tech News").await;
        let other = seed_internet_topic(store.as_ref(), "Cricket").await;

        let err = store
            .update_topic(
                other.id,
                TopicUpdate {
                    name: Some("Tech News".to_string()),
                    ..TopicUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    async fn insert_one(store: &DbAdapter, topic_id: i64, title: &str, at: DateTime<Utc>) {
        store
            .insert_content(vec![NewContentItem {
                topic_id,
                title: title.to_string(),
                summary: String::new(),
                content: String::new(),
                url: None,
                image_url: None,
                source: "test".to_string(),
                fetched_at: at,
            }])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cleanup_retains_the_row_stamped_exactly_at_the_cutoff() {
        let store = memory_store().await;
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;

        let cutoff = Utc::now() - chrono::Duration::days(7);
        insert_one(&store, topic.id, "at-cutoff", cutoff).await;
        insert_one(
            &store,
            topic.id,
            "just-older",
            cutoff - chrono::Duration::seconds(1),
        )
        .await;

        let deleted = store.delete_content_before(topic.id, cutoff).await.unwrap();
        assert_eq!(deleted, 1, "only the strictly older row goes");

        let remaining = store.recent_content(topic.id, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "at-cutoff");
    }

    #[tokio::test]
    async fn cleaning_up_content_cascades_to_bookmarks() {
        let store = memory_store().await;
        let user = store.create_user("Asha", "asha@example.com").await.unwrap();
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;

        let stale = Utc::now() - chrono::Duration::days(30);
        insert_one(&store, topic.id, "stale", stale).await;
        let content = store.recent_content(topic.id, 1).await.unwrap().remove(0);
        let bookmark = store.save_bookmark(user.id, content.id).await.unwrap();

        let deleted = store
            .delete_content_before(topic.id, Utc::now() - chrono::Duration::days(7))
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        assert!(store.bookmarks_for_user(user.id).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_bookmark(bookmark.id).await.unwrap_err(),
            PortError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn saving_the_same_content_twice_is_a_conflict() {
        let store = memory_store().await;
        let user = store.create_user("Asha", "asha@example.com").await.unwrap();
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;
        store
            .insert_content(vec![NewContentItem {
                topic_id: topic.id,
                title: "x".to_string(),
                summary: String::new(),
                content: String::new(),
                url: None,
                image_url: None,
                source: "test".to_string(),
                fetched_at: Utc::now(),
            }])
            .await
            .unwrap();
        let content = store.recent_content(topic.id, 1).await.unwrap().remove(0);

        store.save_bookmark(user.id, content.id).await.unwrap();
        let err = store.save_bookmark(user.id, content.id).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn settings_are_created_with_defaults_on_first_read() {
        let store = memory_store().await;
        let user = store.create_user("Asha", "asha@example.com").await.unwrap();

        let settings = store.get_or_create_settings(user.id).await.unwrap();
        assert_eq!(settings.frequency, Frequency::Daily);
        assert_eq!(settings.preferred_languages, vec!["en".to_string()]);
        assert_eq!(settings.delivery_time.format("%H:%M:%S").to_string(), "06:00:00");

        // The lazily created row round-trips on the second read.
        let again = store.get_or_create_settings(user.id).await.unwrap();
        assert_eq!(again.delivery_time, settings.delivery_time);
    }

    #[tokio::test]
    async fn settings_update_round_trips() {
        let store = memory_store().await;
        let user = store.create_user("Asha", "asha@example.com").await.unwrap();

        let updated = store
            .update_settings(
                user.id,
                SettingsUpdate {
                    frequency: Frequency::Weekly,
                    preferred_languages: vec!["en".to_string(), "hi".to_string()],
                    delivery_time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.frequency, Frequency::Weekly);

        let read_back = store.get_or_create_settings(user.id).await.unwrap();
        assert_eq!(read_back.frequency, Frequency::Weekly);
        assert_eq!(read_back.preferred_languages.len(), 2);
        assert_eq!(read_back.delivery_time, updated.delivery_time);
    }
}
