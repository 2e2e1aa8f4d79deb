use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::campaigns::CampaignEngine;
use crate::services::lifecycle::LifecycleEngine;

/// Cron wiring for the two periodic triggers: the lifecycle sweep (daily
/// reminders and expiries) and the campaign sweep (every minute). The
/// sweeps themselves are idempotent, so the cadence only affects latency.
pub struct SweepService {
    lifecycle: Arc<LifecycleEngine>,
    campaigns: Arc<CampaignEngine>,
    scheduler: JobScheduler,
}

impl SweepService {
    pub async fn new(
        lifecycle: Arc<LifecycleEngine>,
        campaigns: Arc<CampaignEngine>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            lifecycle,
            campaigns,
            scheduler,
        })
    }

    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Reminders at 10:00 UTC, expiries half an hour later.
        let lifecycle = self.lifecycle.clone();
        let reminder_job = Job::new_async("0 0 10 * * *", move |_uuid, _l| {
            let lifecycle = lifecycle.clone();
            Box::pin(async move {
                if let Err(e) = lifecycle.run_reminder_sweep(Utc::now()).await {
                    error!("Reminder sweep failed: {e}");
                }
            })
        })?;

        let lifecycle = self.lifecycle.clone();
        let expiry_job = Job::new_async("0 30 10 * * *", move |_uuid, _l| {
            let lifecycle = lifecycle.clone();
            Box::pin(async move {
                if let Err(e) = lifecycle.run_expiry_sweep(Utc::now()).await {
                    error!("Expiry sweep failed: {e}");
                }
            })
        })?;

        // Campaign messages are timed to the minute.
        let campaigns = self.campaigns.clone();
        let campaign_job = Job::new_async("0 * * * * *", move |_uuid, _l| {
            let campaigns = campaigns.clone();
            Box::pin(async move {
                if let Err(e) = campaigns.run_sweep(Utc::now()).await {
                    error!("Campaign sweep failed: {e}");
                }
            })
        })?;

        self.scheduler.add(reminder_job).await?;
        self.scheduler.add(expiry_job).await?;
        self.scheduler.add(campaign_job).await?;
        self.scheduler.start().await?;

        info!("Sweep service started - lifecycle daily at 10:00/10:30 UTC, campaigns every minute");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    /// Manual trigger for admin commands and tests.
    pub async fn trigger_lifecycle_sweep(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        self.lifecycle.run_reminder_sweep(now).await?;
        self.lifecycle.run_expiry_sweep(now).await?;
        Ok(())
    }

    /// Manual trigger for admin commands and tests.
    pub async fn trigger_campaign_sweep(&self) -> anyhow::Result<()> {
        self.campaigns.run_sweep(Utc::now()).await
    }
}
