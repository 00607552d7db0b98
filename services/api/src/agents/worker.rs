//! services/api/src/agents/worker.rs
//!
//! One worker per topic. The worker picks a fetch strategy from the topic's
//! `(topic_type, feed_source)` pair, persists whatever the gateway produced,
//! and stamps `last_fetched`.
//!
//! Failure policy: a gateway or insert failure never propagates out of a
//! fetch as an `Err`. The worker logs it, stamps the fetch time anyway (so a
//! broken topic does not get hammered on every sweep), and returns an empty
//! batch with the error recorded on the outcome so callers can report it. A
//! gateway answer that decodes to nothing is quieter still: the worker
//! returns empty without stamping, so the next sweep retries.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use curator_core::domain::{ContentItem, Frequency, NewContentItem, Topic, TopicType};
use curator_core::domain::FeedSource;
use curator_core::ports::{ContentStore, LlmGateway, PortError, PortResult};
use tracing::{info, warn};

/// How many previous lessons feed the learning prompt's context window.
const LEARNING_CONTEXT_ITEMS: i64 = 3;
/// How many past lessons a completed curriculum serves per fetch.
const COMPLETED_DISPLAY_LIMIT: i64 = 10;
/// Stored summaries are capped for AI reports.
const SUMMARY_MAX_CHARS: usize = 500;
/// Per-lesson summary cap inside the context window.
const CONTEXT_SUMMARY_CHARS: usize = 200;
/// Fallback curriculum length when a learning topic has no period set.
const DEFAULT_LEARNING_DAYS: i64 = 30;

/// The outcome of one fetch cycle. A swallowed failure leaves `items` empty
/// and carries the error text so sweep reports can surface it.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<ContentItem>,
    pub failure: Option<String>,
}

impl FetchOutcome {
    fn items(items: Vec<ContentItem>) -> Self {
        Self {
            items,
            failure: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            items: Vec::new(),
            failure: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct TopicWorker {
    store: Arc<dyn ContentStore>,
    gateway: Arc<dyn LlmGateway>,
    topic: Topic,
}

impl TopicWorker {
    /// Loads the topic and binds a worker to it.
    pub async fn load(
        store: Arc<dyn ContentStore>,
        gateway: Arc<dyn LlmGateway>,
        topic_id: i64,
    ) -> PortResult<Self> {
        let topic = store.get_topic(topic_id).await?;
        Ok(Self {
            store,
            gateway,
            topic,
        })
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Runs one fetch cycle for this topic and returns the items it produced.
    pub async fn fetch_content(&mut self, max_items: u32) -> PortResult<FetchOutcome> {
        match (self.topic.topic_type, self.topic.feed_source) {
            (TopicType::Learning, _) => self.fetch_learning().await,
            (TopicType::Feed, FeedSource::Ai) => self.fetch_ai().await,
            (TopicType::Feed, FeedSource::Internet) => self.fetch_internet(max_items).await,
        }
    }

    /// Most recent content for this topic.
    pub async fn recent_content(&self, limit: i64) -> PortResult<Vec<ContentItem>> {
        self.store.recent_content(self.topic.id, limit).await
    }

    /// Content fetched within the given UTC calendar date.
    pub async fn content_for_date(
        &self,
        date: chrono::NaiveDate,
        limit: i64,
    ) -> PortResult<Vec<ContentItem>> {
        let (start, end) = utc_day_window(date);
        self.store
            .content_between(self.topic.id, start, end, limit)
            .await
    }

    /// Deletes this topic's content strictly older than `days_to_keep` days.
    pub async fn cleanup_old_content(&self, days_to_keep: i64) -> PortResult<u64> {
        let cutoff = Utc::now() - Duration::days(days_to_keep);
        let deleted = self
            .store
            .delete_content_before(self.topic.id, cutoff)
            .await?;
        if deleted > 0 {
            info!(topic = %self.topic.name, deleted, "Cleaned up old content");
        }
        Ok(deleted)
    }

    //-------------------------------------------------------------------------------------
    // Strategies
    //-------------------------------------------------------------------------------------

    async fn fetch_internet(&mut self, max_items: u32) -> PortResult<FetchOutcome> {
        let fetched = match self
            .gateway
            .fetch_content_for_topic(&self.topic.name, &self.topic.description, max_items)
            .await
        {
            Ok(items) => items,
            Err(e) => return self.swallow(e, "internet fetch").await,
        };

        let now = Utc::now();
        let rows: Vec<NewContentItem> = fetched
            .into_iter()
            .map(|item| NewContentItem {
                topic_id: self.topic.id,
                title: item.title,
                summary: item.summary,
                content: item.content,
                url: item.url,
                image_url: item.image_url,
                source: item.source,
                fetched_at: now,
            })
            .collect();

        let stored = match self.store.insert_content(rows).await {
            Ok(n) => n,
            Err(e) => return self.swallow(e, "content insert").await,
        };

        self.stamp(now).await?;
        info!(topic = %self.topic.name, stored, "Fetched internet content");
        Ok(FetchOutcome::items(
            self.recent_content(stored as i64).await?,
        ))
    }

    async fn fetch_ai(&mut self) -> PortResult<FetchOutcome> {
        let now = Utc::now();
        let frequency = self.topic.agent_config.fetch_frequency;
        let time_period = time_period_label(frequency, now);
        let current_date = now.format("%Y-%m-%d").to_string();

        let generated = match self
            .gateway
            .generate_ai_content(
                &self.topic.name,
                &self.topic.description,
                &time_period,
                &current_date,
            )
            .await
        {
            Ok(Some(item)) => item,
            // No usable payload: stay silent so the next sweep retries.
            Ok(None) => return Ok(FetchOutcome::default()),
            Err(e) => return self.swallow(e, "ai generation").await,
        };

        let title = if generated.title.is_empty() {
            format!("{} - {}", self.topic.name, time_period)
        } else {
            generated.title
        };
        let row = NewContentItem {
            topic_id: self.topic.id,
            title,
            summary: truncate_chars(&generated.summary, SUMMARY_MAX_CHARS),
            content: generated.content,
            url: None,
            image_url: None,
            source: "AI Generated".to_string(),
            fetched_at: now,
        };

        if let Err(e) = self.store.insert_content(vec![row]).await {
            return self.swallow(e, "content insert").await;
        }

        self.stamp(now).await?;
        info!(topic = %self.topic.name, %time_period, "Generated AI report");
        Ok(FetchOutcome::items(self.recent_content(1).await?))
    }

    async fn fetch_learning(&mut self) -> PortResult<FetchOutcome> {
        if self.topic.is_completed {
            return Ok(FetchOutcome::items(
                self.recent_content(COMPLETED_DISPLAY_LIMIT).await?,
            ));
        }

        let current_day = self.topic.current_day.unwrap_or(1);
        let total_days = self
            .topic
            .learning_period_days
            .unwrap_or(DEFAULT_LEARNING_DAYS);
        let context = self.previous_learning_context().await?;

        let lesson = match self
            .gateway
            .generate_learning_content(
                &self.topic.name,
                &self.topic.description,
                current_day,
                total_days,
                &context,
            )
            .await
        {
            Ok(Some(item)) => item,
            Ok(None) => return Ok(FetchOutcome::default()),
            Err(e) => return self.swallow(e, "lesson generation").await,
        };

        let now = Utc::now();
        let title = if lesson.title.is_empty() {
            format!("Day {}: {}", current_day, self.topic.name)
        } else {
            lesson.title
        };
        let row = NewContentItem {
            topic_id: self.topic.id,
            title,
            summary: lesson.summary,
            content: lesson.content,
            url: None,
            image_url: None,
            source: format!("Learning Day {current_day}/{total_days}"),
            fetched_at: now,
        };

        if let Err(e) = self.store.insert_content(vec![row]).await {
            return self.swallow(e, "content insert").await;
        }

        // The lesson is durable, so progress may advance. Completion checks
        // against the pre-increment day: a 30-day course completes when day
        // 30's lesson lands.
        let completed = current_day >= total_days;
        self.store
            .advance_learning_progress(self.topic.id, current_day + 1, completed, now)
            .await?;
        self.topic.current_day = Some(current_day + 1);
        self.topic.is_completed = completed;
        self.topic.last_fetched = Some(now);

        info!(
            topic = %self.topic.name,
            day = current_day,
            total_days,
            completed,
            "Generated learning lesson"
        );
        Ok(FetchOutcome::items(self.recent_content(1).await?))
    }

    //-------------------------------------------------------------------------------------
    // Internals
    //-------------------------------------------------------------------------------------

    /// Builds the continuity context from the last few lessons, oldest first.
    async fn previous_learning_context(&self) -> PortResult<String> {
        let recent = self.recent_content(LEARNING_CONTEXT_ITEMS).await?;
        Ok(format_learning_context(&recent))
    }

    async fn stamp(&mut self, at: DateTime<Utc>) -> PortResult<()> {
        self.store.mark_topic_fetched(self.topic.id, at).await?;
        self.topic.last_fetched = Some(at);
        Ok(())
    }

    /// Applies the failure policy: log, stamp, return an empty batch with
    /// the error recorded on the outcome.
    async fn swallow(&mut self, err: PortError, stage: &str) -> PortResult<FetchOutcome> {
        warn!(topic = %self.topic.name, error = %err, stage, "Fetch failed; stamping and moving on");
        self.stamp(Utc::now()).await?;
        Ok(FetchOutcome::failed(err.to_string()))
    }
}

/// `[00:00:00, 23:59:59]` UTC for a calendar date.
pub fn utc_day_window(date: chrono::NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();
    let end = date
        .and_hms_opt(23, 59, 59)
        .expect("end of day is always valid")
        .and_utc();
    (start, end)
}

/// The human-readable period label threaded into AI report prompts.
pub fn time_period_label(frequency: Frequency, now: DateTime<Utc>) -> String {
    match frequency {
        Frequency::Daily => format!("Daily - {}", now.format("%B %d, %Y")),
        Frequency::Weekly => format!("Weekly - Week {}, {}", now.iso_week().week(), now.year()),
        Frequency::Monthly => format!("Monthly - {}", now.format("%B %Y")),
        Frequency::Custom => now.format("%B %d, %Y").to_string(),
    }
}

/// Formats prior lessons (given most-recent-first) into prompt context,
/// re-ordered oldest first so the narrative reads forward.
pub fn format_learning_context(recent: &[ContentItem]) -> String {
    if recent.is_empty() {
        return "This is the first day of learning.".to_string();
    }
    let mut context = String::from("Previous lessons covered:\n");
    for item in recent.iter().rev() {
        context.push_str(&format!(
            "- {}: {}\n",
            item.title,
            truncate_chars(&item.summary, CONTEXT_SUMMARY_CHARS)
        ));
    }
    context
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        fetched_item, generated_item, memory_store, seed_ai_topic, seed_internet_topic,
        seed_learning_topic, MockGateway,
    };
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn time_period_labels_follow_frequency() {
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        assert_eq!(
            time_period_label(Frequency::Daily, now),
            "Daily - August 24, 2026"
        );
        assert_eq!(
            time_period_label(Frequency::Weekly, now),
            "Weekly - Week 35, 2026"
        );
        assert_eq!(
            time_period_label(Frequency::Monthly, now),
            "Monthly - August 2026"
        );
        assert_eq!(time_period_label(Frequency::Custom, now), "August 24, 2026");
    }

    #[test]
    fn first_lesson_context_is_the_first_day_sentence() {
        assert_eq!(
            format_learning_context(&[]),
            "This is the first day of learning."
        );
    }

    #[test]
    fn learning_context_reads_oldest_first_with_capped_summaries() {
        let now = Utc::now();
        let item = |id: i64, title: &str, summary: &str| ContentItem {
            id,
            topic_id: 1,
            title: title.to_string(),
            summary: summary.to_string(),
            content: String::new(),
            url: None,
            image_url: None,
            source: "Learning Day 1/30".to_string(),
            fetched_at: now,
        };
        // Most recent first, as the store returns them.
        let recent = vec![
            item(3, "Day 3", "newest"),
            item(2, "Day 2", &"x".repeat(300)),
            item(1, "Day 1", "oldest"),
        ];
        let context = format_learning_context(&recent);
        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines[0], "Previous lessons covered:");
        assert!(lines[1].starts_with("- Day 1: oldest"));
        assert!(lines[2].starts_with("- Day 2: "));
        assert_eq!(lines[2].len(), "- Day 2: ".len() + 200);
        assert!(lines[3].starts_with("- Day 3: newest"));
    }

    #[tokio::test]
    async fn internet_fetch_stores_a_batch_and_stamps() {
        let store = memory_store().await;
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;
        let gateway = Arc::new(MockGateway {
            items: vec![fetched_item("Alpha"), fetched_item("Beta")],
            ..MockGateway::default()
        });

        let mut worker = TopicWorker::load(store.clone(), gateway, topic.id)
            .await
            .unwrap();
        let outcome = worker.fetch_content(5).await.unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.items.len(), 2);
        assert!(worker.topic().last_fetched.is_some());
        let reloaded = store.get_topic(topic.id).await.unwrap();
        assert!(reloaded.last_fetched.is_some());
    }

    #[tokio::test]
    async fn internet_fetch_respects_max_items() {
        let store = memory_store().await;
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;
        let gateway = Arc::new(MockGateway {
            items: (0..8).map(|i| fetched_item(&format!("Item{i}"))).collect(),
            ..MockGateway::default()
        });

        let mut worker = TopicWorker::load(store.clone(), gateway, topic.id)
            .await
            .unwrap();
        let outcome = worker.fetch_content(3).await.unwrap();
        assert_eq!(outcome.items.len(), 3);
    }

    #[tokio::test]
    async fn gateway_failure_is_swallowed_and_stamped() {
        let store = memory_store().await;
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;
        let gateway = Arc::new(MockGateway {
            fail: true,
            ..MockGateway::default()
        });

        let mut worker = TopicWorker::load(store.clone(), gateway, topic.id)
            .await
            .unwrap();
        let outcome = worker.fetch_content(5).await.unwrap();

        assert!(outcome.items.is_empty());
        assert!(
            outcome.failure.is_some(),
            "the swallowed error is carried on the outcome"
        );
        let reloaded = store.get_topic(topic.id).await.unwrap();
        assert!(
            reloaded.last_fetched.is_some(),
            "failed fetch still stamps last_fetched"
        );
        assert!(store.recent_content(topic.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ai_fetch_stores_a_single_report() {
        let store = memory_store().await;
        let topic = seed_ai_topic(store.as_ref(), "Market Watch").await;
        let gateway = Arc::new(MockGateway {
            generated: Some(generated_item("Morning Brief")),
            ..MockGateway::default()
        });

        let mut worker = TopicWorker::load(store.clone(), gateway, topic.id)
            .await
            .unwrap();
        let outcome = worker.fetch_content(5).await.unwrap();

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].title, "Morning Brief");
        assert_eq!(outcome.items[0].source, "AI Generated");
        assert_eq!(outcome.items[0].url, None);
    }

    #[tokio::test]
    async fn ai_fetch_truncates_long_summaries() {
        let store = memory_store().await;
        let topic = seed_ai_topic(store.as_ref(), "Market Watch").await;
        let mut report = generated_item("Brief");
        report.summary = "y".repeat(900);
        let gateway = Arc::new(MockGateway {
            generated: Some(report),
            ..MockGateway::default()
        });

        let mut worker = TopicWorker::load(store.clone(), gateway, topic.id)
            .await
            .unwrap();
        let outcome = worker.fetch_content(5).await.unwrap();
        assert_eq!(outcome.items[0].summary.chars().count(), 500);
    }

    #[tokio::test]
    async fn undecodable_ai_payload_skips_the_stamp() {
        let store = memory_store().await;
        let topic = seed_ai_topic(store.as_ref(), "Market Watch").await;
        let gateway = Arc::new(MockGateway::default()); // generated: None

        let mut worker = TopicWorker::load(store.clone(), gateway, topic.id)
            .await
            .unwrap();
        let outcome = worker.fetch_content(5).await.unwrap();

        assert!(outcome.items.is_empty());
        assert!(outcome.succeeded(), "an empty decode is not a failure");
        let reloaded = store.get_topic(topic.id).await.unwrap();
        assert!(
            reloaded.last_fetched.is_none(),
            "an empty decode leaves the topic eligible for retry"
        );
    }

    #[tokio::test]
    async fn learning_fetch_advances_day_and_completes_on_final_day() {
        let store = memory_store().await;
        let topic = seed_learning_topic(store.as_ref(), "Chess", 2).await;
        let gateway = Arc::new(MockGateway {
            generated: Some(generated_item("")),
            ..MockGateway::default()
        });

        let mut worker = TopicWorker::load(store.clone(), gateway.clone(), topic.id)
            .await
            .unwrap();

        let day1 = worker.fetch_content(5).await.unwrap();
        assert_eq!(day1.items.len(), 1);
        assert_eq!(day1.items[0].source, "Learning Day 1/2");
        assert_eq!(worker.topic().current_day, Some(2));
        assert!(!worker.topic().is_completed);

        let day2 = worker.fetch_content(5).await.unwrap();
        assert_eq!(day2.items[0].source, "Learning Day 2/2");
        assert!(worker.topic().is_completed, "day 2 of 2 completes the course");

        let reloaded = store.get_topic(topic.id).await.unwrap();
        assert_eq!(reloaded.current_day, Some(3));
        assert!(reloaded.is_completed);
    }

    #[tokio::test]
    async fn completed_learning_topic_serves_history_without_generating() {
        let store = memory_store().await;
        let topic = seed_learning_topic(store.as_ref(), "Chess", 1).await;
        let gateway = Arc::new(MockGateway {
            generated: Some(generated_item("Day 1: Openings")),
            ..MockGateway::default()
        });

        let mut worker = TopicWorker::load(store.clone(), gateway.clone(), topic.id)
            .await
            .unwrap();
        worker.fetch_content(5).await.unwrap();
        assert!(worker.topic().is_completed);
        let calls_after_completion = gateway.call_count();

        let replay = worker.fetch_content(5).await.unwrap();
        assert_eq!(replay.items.len(), 1);
        assert_eq!(replay.items[0].title, "Day 1: Openings");
        assert_eq!(
            gateway.call_count(),
            calls_after_completion,
            "no generation once completed"
        );
    }

    #[tokio::test]
    async fn content_for_date_only_returns_that_days_items() {
        let store = memory_store().await;
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;

        let yesterday = Utc.with_ymd_and_hms(2026, 8, 23, 9, 0, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap();
        for (title, at) in [("old", yesterday), ("new", today)] {
            store
                .insert_content(vec![NewContentItem {
                    topic_id: topic.id,
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

        let worker = TopicWorker::load(store.clone(), Arc::new(MockGateway::default()), topic.id)
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        let items = worker.content_for_date(date, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "new");
    }

    #[tokio::test]
    async fn day_window_includes_late_evening_and_excludes_the_next_midnight() {
        let store = memory_store().await;
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;

        let late_evening = Utc.with_ymd_and_hms(2026, 8, 24, 23, 59, 0).unwrap();
        let next_midnight = Utc.with_ymd_and_hms(2026, 8, 25, 0, 0, 0).unwrap();
        for (title, at) in [("late", late_evening), ("midnight", next_midnight)] {
            store
                .insert_content(vec![NewContentItem {
                    topic_id: topic.id,
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

        let worker = TopicWorker::load(store.clone(), Arc::new(MockGateway::default()), topic.id)
            .await
            .unwrap();

        let on_the_24th = worker
            .content_for_date(NaiveDate::from_ymd_opt(2026, 8, 24).unwrap(), 10)
            .await
            .unwrap();
        assert_eq!(on_the_24th.len(), 1);
        assert_eq!(on_the_24th[0].title, "late");

        let on_the_25th = worker
            .content_for_date(NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(), 10)
            .await
            .unwrap();
        assert_eq!(on_the_25th.len(), 1);
        assert_eq!(on_the_25th[0].title, "midnight");
    }

    #[tokio::test]
    async fn cleanup_deletes_strictly_older_content_only() {
        let store = memory_store().await;
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;

        let now = Utc::now();
        let rows = [
            ("ancient", now - Duration::days(10)),
            ("recent", now - Duration::days(2)),
        ];
        for (title, at) in rows {
            store
                .insert_content(vec![NewContentItem {
                    topic_id: topic.id,
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

        let worker = TopicWorker::load(store.clone(), Arc::new(MockGateway::default()), topic.id)
            .await
            .unwrap();
        let deleted = worker.cleanup_old_content(7).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = store.recent_content(topic.id, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "recent");
    }
}
