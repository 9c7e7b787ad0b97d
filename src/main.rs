use std::sync::Arc;

use aurum_pipeline::api::{run_server, AppState};
use aurum_pipeline::config::AppConfig;
use aurum_pipeline::services::maintenance;
use aurum_pipeline::services::pipeline::{Pipeline, RunOutcome};
use aurum_pipeline::services::scheduler::DailyScheduler;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: aurum_pipeline [run|schedule|serve|repair]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());

    // Load Configuration
    let config = AppConfig::load()?;
    info!("Starting Aurum pipeline (mode: {})", mode);

    match mode.as_str() {
        "run" => {
            let pipeline = Pipeline::new(config)?;
            match pipeline.run_once().await? {
                RunOutcome::Recorded { observation, forecast, .. } => info!(
                    "📒 Recorded {} = ₹{}; forecast: {}",
                    observation.date,
                    observation.price,
                    forecast
                        .map(|f| format!("₹{} for {}", f.forecast_price, f.forecast_date))
                        .unwrap_or_else(|| "none".to_string())
                ),
                RunOutcome::Skipped { date } => info!("⏭️ Idempotent skip: {} already recorded", date),
                // Nothing was written; the next trigger retries.
                RunOutcome::ExtractionFailed { class, reason } => {
                    warn!("⚠️ No observation today ({}): {}", class, reason)
                }
            }
        }
        "schedule" => {
            let pipeline = Arc::new(Pipeline::new(config)?);
            let _scheduler = DailyScheduler::new(pipeline.clone()).start().await?;
            run_server(Arc::new(AppState { pipeline })).await?;
        }
        "serve" => {
            let pipeline = Arc::new(Pipeline::new(config)?);
            run_server(Arc::new(AppState { pipeline })).await?;
        }
        "repair" => {
            let report = maintenance::repair(&config.storage)?;
            info!("🧹 Repair complete: {}", serde_json::to_string(&report)?);
        }
        other => {
            return Err(format!("unknown mode '{}'; {}", other, USAGE).into());
        }
    }

    Ok(())
}
