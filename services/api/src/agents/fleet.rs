//! services/api/src/agents/fleet.rs
//!
//! Sweeps a set of topics through their workers, one at a time, with a pacing
//! delay between topics so the gateway's rate limits are respected. One
//! topic's failure never aborts the sweep.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use curator_core::domain::Topic;
use curator_core::ports::{ContentStore, LlmGateway, PortResult};
use serde::Serialize;
use tracing::{debug, error, info};

use super::worker::{FetchOutcome, TopicWorker};

/// The per-topic outcome of a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct TopicReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_fetched: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TopicReport {
    fn success(items_fetched: u64) -> Self {
        Self {
            success: true,
            items_fetched: Some(items_fetched),
            error: None,
        }
    }

    fn failure(error: String) -> Self {
        Self {
            success: false,
            items_fetched: None,
            error: Some(error),
        }
    }
}

/// The aggregate outcome of a sweep, keyed by topic name.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub results: BTreeMap<String, TopicReport>,
}

impl SweepReport {
    pub fn topics_swept(&self) -> usize {
        self.results.len()
    }

    pub fn topics_succeeded(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    pub fn topics_failed(&self) -> usize {
        self.results.values().filter(|r| !r.success).count()
    }

    pub fn total_items(&self) -> u64 {
        self.results
            .values()
            .filter_map(|r| r.items_fetched)
            .sum()
    }
}

pub struct FleetCoordinator {
    store: Arc<dyn ContentStore>,
    gateway: Arc<dyn LlmGateway>,
    /// Delay inserted between consecutive topics.
    pacing: Duration,
    /// Per-fetch item cap handed to internet workers.
    max_items: u32,
}

impl FleetCoordinator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        gateway: Arc<dyn LlmGateway>,
        pacing: Duration,
        max_items: u32,
    ) -> Self {
        Self {
            store,
            gateway,
            pacing,
            max_items,
        }
    }

    /// Fetches content for every topic in the system.
    pub async fn sweep_all(&self) -> PortResult<SweepReport> {
        let topics = self.store.list_topics().await?;
        info!(topics = topics.len(), "Starting full fleet sweep");
        Ok(self.sweep(topics).await)
    }

    /// Fetches content for every topic linked to one user.
    pub async fn sweep_user(&self, user_id: i64) -> PortResult<SweepReport> {
        let topics = self.store.topics_for_user(user_id).await?;
        info!(user_id, topics = topics.len(), "Starting user fleet sweep");
        Ok(self.sweep(topics).await)
    }

    /// Runs cleanup across every topic and returns the total rows deleted.
    pub async fn cleanup_all(&self, days_to_keep: i64) -> PortResult<u64> {
        let topics = self.store.list_topics().await?;
        let mut total = 0u64;
        for topic in topics {
            let worker =
                TopicWorker::load(self.store.clone(), self.gateway.clone(), topic.id).await?;
            total += worker.cleanup_old_content(days_to_keep).await?;
        }
        info!(total, days_to_keep, "Cleanup pass complete");
        Ok(total)
    }

    async fn sweep(&self, topics: Vec<Topic>) -> SweepReport {
        let mut report = SweepReport::default();
        for (index, topic) in topics.into_iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                debug!(pacing = ?self.pacing, "Pacing before next topic");
                tokio::time::sleep(self.pacing).await;
            }

            let entry = match self.fetch_one(topic.id).await {
                Ok(outcome) => match outcome.failure {
                    None => TopicReport::success(outcome.items.len() as u64),
                    // The worker already stamped and logged; the report
                    // still has to show the failure.
                    Some(error) => TopicReport::failure(error),
                },
                Err(e) => {
                    error!(topic = %topic.name, error = %e, "Topic sweep failed");
                    TopicReport::failure(e.to_string())
                }
            };
            report.results.insert(topic.name, entry);
        }
        info!(
            swept = report.topics_swept(),
            failed = report.topics_failed(),
            items = report.total_items(),
            "Sweep complete"
        );
        report
    }

    async fn fetch_one(&self, topic_id: i64) -> PortResult<FetchOutcome> {
        let mut worker =
            TopicWorker::load(self.store.clone(), self.gateway.clone(), topic_id).await?;
        worker.fetch_content(self.max_items).await
    }
}

//=========================================================================================
// Tests
//=========================================================================================
