//! services/api/src/scheduler.rs
//!
//! Background scheduling: twice-daily fleet sweeps and a nightly cleanup,
//! driven by cron expressions. Each job carries an overlap guard so a slow
//! sweep is skipped rather than stacked.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use curator_core::ports::{ContentStore, LlmGateway, PortResult};
use serde::Serialize;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::{FleetCoordinator, SweepReport};
use crate::config::Config;

/// Morning fetch, 06:00 UTC.
const MORNING_FETCH_CRON: &str = "0 0 6 * * *";
/// Nightly cleanup, 02:00 UTC.
const CLEANUP_CRON: &str = "0 0 2 * * *";
/// Evening fetch, 18:00 UTC.
const EVENING_FETCH_CRON: &str = "0 0 18 * * *";

#[derive(Debug, Clone)]
struct JobHandle {
    id: Uuid,
    name: &'static str,
    cron: &'static str,
}

/// A point-in-time snapshot of the scheduler, served by the status endpoint.
#[derive(Debug, Serialize)]
pub struct SchedulerStatus {
    pub status: &'static str,
    pub jobs_count: usize,
    pub jobs: Vec<JobStatus>,
}

#[derive(Debug, Serialize)]
pub struct JobStatus {
    pub id: Uuid,
    pub name: &'static str,
    pub cron: &'static str,
    pub next_run: Option<DateTime<Utc>>,
}

/// Owns the cron scheduler and the dependencies its jobs close over.
pub struct ContentScheduler {
    scheduler: JobScheduler,
    jobs: Vec<JobHandle>,
    running: AtomicBool,
    store: Arc<dyn ContentStore>,
    gateway: Arc<dyn LlmGateway>,
    sweep_pacing: Duration,
    retention_days: i64,
    max_items: u32,
}

impl ContentScheduler {
    /// Registers the three standing jobs and starts the scheduler.
    pub async fn start(
        store: Arc<dyn ContentStore>,
        gateway: Arc<dyn LlmGateway>,
        config: &Config,
    ) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;
        let mut jobs = Vec::new();

        let sweep_pacing = config.sweep_pacing;
        let retention_days = config.retention_days;
        let max_items = config.max_items_per_fetch;

        for (name, cron) in [
            ("morning_fetch", MORNING_FETCH_CRON),
            ("evening_fetch", EVENING_FETCH_CRON),
        ] {
            let store = store.clone();
            let gateway = gateway.clone();
            let id = add_guarded_job(&scheduler, cron, name, move || {
                let fleet =
                    FleetCoordinator::new(store.clone(), gateway.clone(), sweep_pacing, max_items);
                async move {
                    match fleet.sweep_all().await {
                        Ok(report) => info!(
                            job = name,
                            swept = report.topics_swept(),
                            failed = report.topics_failed(),
                            items = report.total_items(),
                            "Scheduled fetch complete"
                        ),
                        Err(e) => error!(job = name, error = %e, "Scheduled fetch failed"),
                    }
                }
            })
            .await?;
            jobs.push(JobHandle { id, name, cron });
        }

        {
            let store = store.clone();
            let gateway = gateway.clone();
            let id = add_guarded_job(&scheduler, CLEANUP_CRON, "nightly_cleanup", move || {
                let fleet = FleetCoordinator::new(
                    store.clone(),
                    gateway.clone(),
                    Duration::ZERO,
                    max_items,
                );
                async move {
                    match fleet.cleanup_all(retention_days).await {
                        Ok(deleted) => {
                            info!(deleted, "Scheduled cleanup complete");
                        }
                        Err(e) => error!(error = %e, "Scheduled cleanup failed"),
                    }
                }
            })
            .await?;
            jobs.push(JobHandle {
                id,
                name: "nightly_cleanup",
                cron: CLEANUP_CRON,
            });
        }

        scheduler.start().await?;
        info!(jobs = jobs.len(), "Content scheduler started");

        Ok(Self {
            scheduler,
            jobs,
            running: AtomicBool::new(true),
            store,
            gateway,
            sweep_pacing,
            retention_days,
            max_items,
        })
    }

    /// Snapshot of registered jobs and their next fire times.
    pub async fn status(&self) -> SchedulerStatus {
        let mut jobs = Vec::with_capacity(self.jobs.len());
        let mut scheduler = self.scheduler.clone();
        for handle in &self.jobs {
            let next_run = scheduler.next_tick_for_job(handle.id).await.ok().flatten();
            jobs.push(JobStatus {
                id: handle.id,
                name: handle.name,
                cron: handle.cron,
                next_run,
            });
        }
        SchedulerStatus {
            status: if self.running.load(Ordering::SeqCst) {
                "running"
            } else {
                "stopped"
            },
            jobs_count: jobs.len(),
            jobs,
        }
    }

    /// Runs a full fleet sweep inline, outside the cron cadence.
    pub async fn trigger_fetch_now(&self) -> PortResult<SweepReport> {
        info!("Manual fetch trigger");
        self.fleet(self.sweep_pacing).sweep_all().await
    }

    /// Runs the cleanup pass inline, outside the cron cadence.
    pub async fn trigger_cleanup_now(&self) -> PortResult<u64> {
        info!("Manual cleanup trigger");
        self.fleet(Duration::ZERO)
            .cleanup_all(self.retention_days)
            .await
    }

    pub async fn shutdown(&self) {
        let mut scheduler = self.scheduler.clone();
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Scheduler shutdown reported an error");
        }
        self.running.store(false, Ordering::SeqCst);
        info!("Content scheduler stopped");
    }

    fn fleet(&self, pacing: Duration) -> FleetCoordinator {
        FleetCoordinator::new(
            self.store.clone(),
            self.gateway.clone(),
            pacing,
            self.max_items,
        )
    }
}

/// Registers a cron job that skips a fire while the previous one is still
/// running, instead of stacking invocations.
async fn add_guarded_job<F, Fut>(
    scheduler: &JobScheduler,
    cron: &str,
    name: &'static str,
    mut run: F,
) -> Result<Uuid, JobSchedulerError>
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(job = name, "Skipping fire: previous run still in progress");
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            fut.await;
            guard.store(false, Ordering::SeqCst);
        })
    })?;

    let id = scheduler.add(job).await?;
    info!(job = name, cron, "Registered scheduled job");
    Ok(id)
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_support::{fetched_item, memory_store, seed_internet_topic, MockGateway};
    use std::net::SocketAddr;

    fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
            database_url: "sqlite::memory:".to_string(),
            log_level: tracing::Level::INFO,
            openai_api_key: None,
            gateway_model: "test-model".to_string(),
            retention_days: 7,
            refresh_pacing: Duration::ZERO,
            sweep_pacing: Duration::ZERO,
            max_items_per_fetch: 5,
        }
    }

    #[tokio::test]
    async fn scheduler_registers_three_jobs() {
        let store = memory_store().await;
        let gateway = Arc::new(MockGateway::default());
        let scheduler = ContentScheduler::start(store, gateway, &test_config())
            .await
            .unwrap();

        let status = scheduler.status().await;
        assert_eq!(status.status, "running");
        assert_eq!(status.jobs_count, 3);
        let names: Vec<&str> = status.jobs.iter().map(|j| j.name).collect();
        assert!(names.contains(&"morning_fetch"));
        assert!(names.contains(&"evening_fetch"));
        assert!(names.contains(&"nightly_cleanup"));
        for job in &status.jobs {
            assert!(job.next_run.is_some(), "{} has a next fire time", job.name);
        }

        scheduler.shutdown().await;
        assert_eq!(scheduler.status().await.status, "stopped");
    }

    #[tokio::test]
    async fn manual_fetch_trigger_sweeps_the_fleet() {
        let store = memory_store().await;
        seed_internet_topic(store.as_ref(), "Tech News").await;
        let gateway = Arc::new(MockGateway {
            items: vec![fetched_item("One")],
            ..MockGateway::default()
        });

        let scheduler = ContentScheduler::start(store, gateway, &test_config())
            .await
            .unwrap();
        let report = scheduler.trigger_fetch_now().await.unwrap();
        assert_eq!(report.topics_swept(), 1);
        assert_eq!(report.total_items(), 1);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn manual_cleanup_trigger_reports_deletions() {
        use chrono::{Duration as ChronoDuration, Utc};
        use curator_core::domain::NewContentItem;

        let store = memory_store().await;
        let topic = seed_internet_topic(store.as_ref(), "Tech News").await;
        store
            .insert_content(vec![NewContentItem {
                topic_id: topic.id,
                title: "stale".to_string(),
                summary: String::new(),
                content: String::new(),
                url: None,
                image_url: None,
                source: "test".to_string(),
                fetched_at: Utc::now() - ChronoDuration::days(30),
            }])
            .await
            .unwrap();

        let scheduler = ContentScheduler::start(store, Arc::new(MockGateway::default()), &test_config())
            .await
            .unwrap();
        let deleted = scheduler.trigger_cleanup_now().await.unwrap();
        assert_eq!(deleted, 1);
        scheduler.shutdown().await;
    }
}
