// dbbackup-agent/src/scheduler/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::backup::engine::EngineStrategy;
use crate::backup::orchestrator::BackupOrchestrator;
use crate::errors::BackupError;

/// Something the scheduler can fire.
#[async_trait]
pub trait BackupJob: Send + Sync {
    async fn run_backup(&self) -> Result<(), BackupError>;
}

#[async_trait]
impl<E: EngineStrategy> BackupJob for BackupOrchestrator<E> {
    async fn run_backup(&self) -> Result<(), BackupError> {
        self.perform_backup().await.map(|_| ())
    }
}

/// Runs one backup immediately, then one per schedule tick until Ctrl-C.
pub async fn run(job: &dyn BackupJob, schedule: &Schedule) {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };
    run_until(job, schedule, shutdown).await;
    info!("Backup scheduler stopped");
}

/// Runs are serial: the next tick is computed only after the previous run finished.
/// A failed run is logged and never stops the loop.
pub async fn run_until<F>(job: &dyn BackupJob, schedule: &Schedule, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    fire(job).await;
    loop {
        let now = Local::now();
        let Some(wait) = delay_until_next(schedule, &now) else {
            warn!("Backup schedule has no upcoming runs");
            return;
        };
        info!(wait_secs = wait.as_secs(), "⏰ Next backup scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => fire(job).await,
            _ = &mut shutdown => return,
        }
    }
}

async fn fire(job: &dyn BackupJob) {
    if let Err(e) = job.run_backup().await {
        error!(error = %e, "Scheduled backup failed");
    }
}

/// Time from `now` until the schedule next fires.
pub fn delay_until_next<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> Option<Duration> {
    let next = schedule.after(now).next()?;
    Some((next - now.clone()).to_std().unwrap_or(Duration::ZERO))
}
