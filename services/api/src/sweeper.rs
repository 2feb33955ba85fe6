//! Periodic removal of stale scratch files

use std::time::Duration;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use common::ScratchDir;

/// Start a scheduler that removes scratch files older than `max_age`
///
/// `schedule` is a cron expression with a seconds field. The returned
/// scheduler must be kept alive for the job to keep running.
pub async fn start_sweeper(
    scratch: ScratchDir,
    schedule: &str,
    max_age: Duration,
) -> Result<JobScheduler> {
    info!("Starting scratch sweeper with schedule: {}", schedule);

    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let scratch = scratch.clone();
        Box::pin(async move {
            match scratch.sweep_stale(max_age).await {
                Ok(0) => {}
                Ok(removed) => info!("Sweep removed {} stale file(s)", removed),
                Err(e) => error!("Scratch sweep failed: {}", e),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Scratch sweeper started");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_invalid_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::open(dir.path()).unwrap();
        let result = start_sweeper(scratch, "every ten minutes", Duration::from_secs(60)).await;
        assert!(result.is_err());
    }
}
