//! Periodic window sweep on tokio-cron-scheduler.

use std::sync::Arc;

use osm_proxy_core::ports::RateLimitTracker;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use super::{WINDOW_SWEEP_SCHEDULE, sweep_rate_limit_windows};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// `SCHEDULER_ENABLED`; lazy resets keep the budgets correct without it.
    pub enabled: bool,
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

/// Owns the cron runtime that sweeps expired rate limit windows.
pub struct WindowSweepScheduler {
    inner: JobScheduler,
}

impl WindowSweepScheduler {
    /// Register the sweep on [`WINDOW_SWEEP_SCHEDULE`] and start ticking.
    ///
    /// Returns `None` when the scheduler is disabled.
    pub async fn start(
        config: &SchedulerConfig,
        tracker: Arc<dyn RateLimitTracker>,
    ) -> Result<Option<Self>, JobSchedulerError> {
        if !config.enabled {
            tracing::info!("Window sweep scheduler disabled");
            return Ok(None);
        }

        let inner = JobScheduler::new().await?;
        let job_id = inner.add(sweep_job(WINDOW_SWEEP_SCHEDULE, tracker)?).await?;
        inner.start().await?;

        tracing::info!(schedule = WINDOW_SWEEP_SCHEDULE, job_id = %job_id, "Window sweep scheduled");
        Ok(Some(Self { inner }))
    }

    pub async fn shutdown(mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Window sweep scheduler stopped");
        Ok(())
    }
}

fn sweep_job(schedule: &str, tracker: Arc<dyn RateLimitTracker>) -> Result<Job, JobSchedulerError> {
    Job::new_async(schedule, move |_id, _lock| {
        let tracker = tracker.clone();
        Box::pin(async move {
            sweep_rate_limit_windows(tracker.as_ref());
        })
    })
}
