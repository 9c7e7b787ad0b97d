use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::data::PredictionLog;
use crate::error::PipelineError;
use crate::forecast::{ForecastOutput, Scorecard};
use crate::sentiment::SentimentSnapshot;
use crate::services::pipeline::Pipeline;

pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard", get(get_dashboard))
        .route("/mood", get(get_mood))
        .route("/scorecard", get(get_scorecard))
        .route("/run", post(trigger_run))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>) -> Result<(), PipelineError> {
    let bind = state.pipeline.config().runtime.api_bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("🌐 [API] Listening on {}", bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let summary = state.pipeline.reporter().summary();
    Json(json!({
        "status": "ok",
        "runs": summary.total_runs,
        "last_run": summary.last_run,
    }))
}

async fn get_dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let path = state.pipeline.config().storage.dashboard_path();
    match ForecastOutput::load(&path) {
        Ok(Some(doc)) => Json(doc).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "No forecast published yet.").into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_mood(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let path = state.pipeline.config().storage.mood_path();
    match SentimentSnapshot::load(&path) {
        Ok(Some(snapshot)) => Json(snapshot).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "No sentiment snapshot yet.").into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_scorecard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = &state.pipeline.config().storage;

    let history = match state.pipeline.ledger().read_all() {
        Ok(h) => h,
        Err(e) => return internal_error(e),
    };
    let log = match PredictionLog::load(storage.prediction_log_path()) {
        Ok(l) => l,
        Err(e) => return internal_error(e),
    };

    Json(Scorecard::compute(&log, &history)).into_response()
}

async fn trigger_run(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.run_once().await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    error!("[API] {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::data::{Ledger, Observation, PredictionRecord};
    use chrono::NaiveDate;

    async fn serve(dir: &tempfile::TempDir) -> (String, AppConfig) {
        let mut config = AppConfig::default();
        config.fx.url = None;
        config.storage.data_dir = dir.path().to_path_buf();

        let state = Arc::new(AppState {
            pipeline: Arc::new(Pipeline::new(config.clone()).unwrap()),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        (format!("http://{}", addr), config)
    }

    #[tokio::test]
    async fn test_health_and_missing_documents() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _) = serve(&dir).await;
        let client = reqwest::Client::new();

        let health: serde_json::Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        let resp = client.get(format!("{}/dashboard", base)).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let resp = client.get(format!("{}/mood", base)).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_scorecard_recomputed_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (base, config) = serve(&dir).await;

        let d = |day| NaiveDate::from_ymd_opt(2025, 12, day).unwrap();
        let ledger = Ledger::new(config.storage.ledger_path());
        ledger.append_if_new(&Observation::new(d(1), 126_000)).unwrap();
        ledger.append_if_new(&Observation::new(d(2), 126_500)).unwrap();

        let mut log = PredictionLog::empty(config.storage.prediction_log_path());
        log.record(PredictionRecord {
            target_date: d(2),
            predicted_price: 126_300,
        });
        log.save().unwrap();

        let card: Scorecard = reqwest::get(format!("{}/scorecard", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(card.samples, 1);
        assert_eq!(card.mae, Some(200.0));
        assert_eq!(card.win_rate_pct, Some(100.0));
    }
}
