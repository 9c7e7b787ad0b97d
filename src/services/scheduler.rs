//! Daily trigger for the pipeline. Cron expressions are seconds-resolution
//! and evaluated in UTC.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::services::pipeline::{Pipeline, RunOutcome};

pub struct DailyScheduler {
    pipeline: Arc<Pipeline>,
    cron: String,
}

impl DailyScheduler {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let cron = pipeline.config().runtime.daily_cron.clone();
        Self { pipeline, cron }
    }

    pub fn with_schedule(pipeline: Arc<Pipeline>, cron: impl Into<String>) -> Self {
        Self {
            pipeline,
            cron: cron.into(),
        }
    }

    /// Starts the cron job. The returned scheduler must be kept alive for the
    /// job to keep firing.
    pub async fn start(&self) -> Result<JobScheduler, PipelineError> {
        let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;
        let pipeline = self.pipeline.clone();

        let job = Job::new_async(self.cron.as_str(), move |_uuid, _l| {
            let pipeline = pipeline.clone();

            Box::pin(async move {
                match pipeline.run_once().await {
                    Ok(RunOutcome::ExtractionFailed { class, reason }) => {
                        warn!("⚠️ [SCHEDULER] Run ended without data ({}): {}", class, reason)
                    }
                    Ok(outcome) => info!("✅ [SCHEDULER] Run finished: {}", outcome.name()),
                    Err(e) => error!("❌ [SCHEDULER] Run failed: {}", e),
                }
            })
        })
        .map_err(scheduler_error)?;

        scheduler.add(job).await.map_err(scheduler_error)?;
        scheduler.start().await.map_err(scheduler_error)?;

        info!("📅 [SCHEDULER] Daily run scheduled: {}", self.cron);
        Ok(scheduler)
    }
}

fn scheduler_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Scheduler(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn pipeline() -> Arc<Pipeline> {
        let mut config = AppConfig::default();
        config.fx.url = None;
        Arc::new(Pipeline::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_uses_configured_cron() {
        let scheduler = DailyScheduler::new(pipeline());
        assert_eq!(scheduler.cron, "0 0 1 * * *");
    }

    #[tokio::test]
    async fn test_invalid_cron_is_rejected() {
        let scheduler = DailyScheduler::with_schedule(pipeline(), "not a cron");
        assert!(matches!(scheduler.start().await, Err(PipelineError::Scheduler(_))));
    }
}
