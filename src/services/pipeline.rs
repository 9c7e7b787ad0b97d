//! One invocation: extract → ledger → (if new) sentiment + forecast.

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::constants::events;
use crate::data::{Ledger, Observation};
use crate::error::{FailureClass, PipelineError};
use crate::extract::Extractor;
use crate::forecast::{ForecastEngine, ForecastOutput};
use crate::sentiment::SentimentScorer;
use crate::services::reporting::{RunLogEntry, RunReporter};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// New observation written; forecast is None when the engine declined.
    Recorded {
        observation: Observation,
        forecast: Option<ForecastOutput>,
        forecast_error: Option<String>,
    },
    /// The date was already in the ledger; nothing written.
    Skipped { date: NaiveDate },
    /// Nothing written; safe to retry on the next trigger.
    ExtractionFailed { class: FailureClass, reason: String },
}

impl RunOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            RunOutcome::Recorded { .. } => "recorded",
            RunOutcome::Skipped { .. } => "skipped",
            RunOutcome::ExtractionFailed { .. } => "extraction_failed",
        }
    }
}

pub struct Pipeline {
    config: AppConfig,
    extractor: Extractor,
    ledger: Ledger,
    sentiment: SentimentScorer,
    forecast: ForecastEngine,
    reporter: RunReporter,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            extractor: Extractor::new(&config)?,
            ledger: Ledger::new(config.storage.ledger_path()),
            sentiment: SentimentScorer::new(&config)?,
            forecast: ForecastEngine::new(&config),
            reporter: RunReporter::new(&config.storage),
            run_lock: Mutex::new(()),
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn reporter(&self) -> &RunReporter {
        &self.reporter
    }

    /// Runs for today's date in the market time zone.
    pub async fn run_once(&self) -> Result<RunOutcome, PipelineError> {
        self.run(None).await
    }

    /// Runs with the observation dated `date` instead of today.
    pub async fn run_for(&self, date: NaiveDate) -> Result<RunOutcome, PipelineError> {
        self.run(Some(date)).await
    }

    async fn run(&self, date: Option<NaiveDate>) -> Result<RunOutcome, PipelineError> {
        let _guard = self.run_lock.lock().await;
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, "🚀 [PIPELINE] Run started");

        let extracted = match date {
            Some(d) => self.extractor.extract_for(d).await,
            None => self.extractor.extract().await,
        };

        let observation = match extracted {
            Ok(obs) => obs,
            Err(e) => {
                error!(
                    event = events::EXTRACTION_FAILED,
                    run_id = %run_id,
                    class = %e.class(),
                    "❌ [PIPELINE] Extraction failed: {}",
                    e
                );
                let mut entry = RunLogEntry::new(&run_id, "extraction_failed");
                entry.date = date;
                entry.notes = Some(format!("{}: {}", e.class(), e));
                self.reporter.record(entry);

                return Ok(RunOutcome::ExtractionFailed {
                    class: e.class(),
                    reason: e.to_string(),
                });
            }
        };

        let mut entry = RunLogEntry::new(&run_id, "recorded");
        entry.date = Some(observation.date);
        entry.price = Some(observation.price);

        let written = match self.ledger.append_if_new(&observation) {
            Ok(written) => written,
            Err(e) => {
                error!(run_id = %run_id, class = %e.class(), "❌ [PIPELINE] Ledger commit failed: {}", e);
                entry.outcome = "ledger_failed".to_string();
                entry.notes = Some(e.to_string());
                self.reporter.record(entry);
                return Err(e.into());
            }
        };

        if !written {
            info!(run_id = %run_id, "⏭️ [PIPELINE] {} already recorded - nothing to do", observation.date);
            entry.outcome = "skipped".to_string();
            self.reporter.record(entry);
            return Ok(RunOutcome::Skipped {
                date: observation.date,
            });
        }

        let (forecast, forecast_error) = self.forecast_stage(&run_id).await;
        entry.forecast = forecast.as_ref().map(|f| f.forecast_price);
        entry.notes = forecast_error.clone();
        self.reporter.record(entry);

        info!(run_id = %run_id, "✅ [PIPELINE] Run complete");
        Ok(RunOutcome::Recorded {
            observation,
            forecast,
            forecast_error,
        })
    }

    /// Sentiment then forecast. Failures here never roll back the ledger.
    async fn forecast_stage(&self, run_id: &str) -> (Option<ForecastOutput>, Option<String>) {
        let snapshot = self.sentiment.score().await;

        let history = match self.ledger.read_all() {
            Ok(h) => h,
            Err(e) => {
                warn!(run_id = %run_id, "⚠️ [PIPELINE] Could not re-read ledger for forecast: {}", e);
                return (None, Some(e.to_string()));
            }
        };

        let output = match self.forecast.run(&history, &snapshot) {
            Ok(output) => output,
            Err(e) => {
                warn!(run_id = %run_id, class = %e.class(), "⚠️ [PIPELINE] Forecast skipped: {}", e);
                return (None, Some(e.to_string()));
            }
        };

        match self.reporter.publish_dashboard(&output) {
            Ok(()) => (Some(output), None),
            Err(e) => {
                warn!(run_id = %run_id, "⚠️ [PIPELINE] Dashboard write failed: {}", e);
                (Some(output), Some(format!("dashboard write failed: {}", e)))
            }
        }
    }
}
