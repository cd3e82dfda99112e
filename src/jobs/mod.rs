use crate::metrics;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::interval;
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background sweeps
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        if !self.context.config.jobs.enabled {
            info!("Background jobs disabled");
            return;
        }

        info!("Starting background job scheduler");

        tokio::spawn(Self::expiration_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::suspension_sweep_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Expire listings past their expiration date
    async fn expiration_sweep_job(scheduler: Arc<Self>) {
        let mut interval = interval(scheduler.context.config.jobs.expiration_sweep_interval);

        loop {
            interval.tick().await;
            info!("Running expiration sweep");

            let ctx = &scheduler.context;
            let start = Instant::now();
            let result = tasks::expire_overdue_listings(
                &ctx.moderation,
                &ctx.config.policy.system_actor,
                chrono::Utc::now(),
            )
            .await;

            match result {
                Ok(report) => {
                    metrics::record_background_job(
                        "expiration_sweep",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if report.processed > 0 || report.failed > 0 {
                        info!(
                            "Expired {} listings ({} failed)",
                            report.processed, report.failed
                        );
                    }
                }
                Err(e) => {
                    metrics::record_background_job(
                        "expiration_sweep",
                        "error",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to run expiration sweep: {}", e);
                }
            }
        }
    }

    /// Restore accounts whose suspension has ended
    async fn suspension_sweep_job(scheduler: Arc<Self>) {
        let mut interval = interval(scheduler.context.config.jobs.suspension_sweep_interval);

        loop {
            interval.tick().await;
            info!("Running expired suspension sweep");

            let ctx = &scheduler.context;
            let start = Instant::now();
            let result = tasks::restore_lapsed_suspensions(
                &ctx.moderation,
                &ctx.config.policy.system_actor,
                chrono::Utc::now(),
            )
            .await;

            match result {
                Ok(report) => {
                    metrics::record_background_job(
                        "suspension_sweep",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if report.processed > 0 || report.failed > 0 {
                        info!(
                            "Restored {} accounts ({} failed)",
                            report.processed, report.failed
                        );
                    }
                }
                Err(e) => {
                    metrics::record_background_job(
                        "suspension_sweep",
                        "error",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to run suspension sweep: {}", e);
                }
            }
        }
    }
}
