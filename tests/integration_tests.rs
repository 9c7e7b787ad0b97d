//! Integration tests for the daily pipeline.
//! These tests serve fixture pages and feeds from a local server and verify
//! that extraction, the ledger, sentiment and the forecast work together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aurum_pipeline::config::AppConfig;
use aurum_pipeline::data::{Ledger, Observation, PredictionLog};
use aurum_pipeline::error::{FailureClass, PipelineError};
use aurum_pipeline::forecast::ForecastOutput;
use aurum_pipeline::sentiment::SentimentSnapshot;
use aurum_pipeline::services::pipeline::{Pipeline, RunOutcome};
use aurum_pipeline::services::reporting::RunLogEntry;
use axum::{extract::State, response::Html, routing::get, Json, Router};
use chrono::{Days, NaiveDate};
use serde_json::json;

const BASE_PRICE: u64 = 110_000;
const STEP: u64 = 100;

/// Per-gram price shown on the fixture page; 0 serves a page without rates.
struct Fixture {
    per_gram: AtomicU64,
}

impl Fixture {
    fn set_canonical(&self, price: u64) {
        self.per_gram.store(price / 10, Ordering::SeqCst);
    }
}

async fn rate_page(State(fixture): State<Arc<Fixture>>) -> Html<String> {
    let per_gram = fixture.per_gram.load(Ordering::SeqCst);
    if per_gram == 0 {
        return Html("<html><body><h1>Site under maintenance</h1></body></html>".to_string());
    }
    Html(format!(
        r#"<html><body>
          <div class="breadcrumb">Home / Gold Rates / Chennai</div>
          <h2>Today 24 Carat Gold Rate Per Gram in Chennai (INR)</h2>
          <table><tr><th>Gram</th><th>Today</th></tr><tr><td>1</td><td>₹99,999</td></tr></table>
          <h2>Today 22 Carat Gold Rate Per Gram in Chennai (INR)</h2>
          <table>
            <tr><th>Gram</th><th>Today</th><th>Yesterday</th></tr>
            <tr><td>1</td><td>₹{}</td><td>₹0</td></tr>
            <tr><td>8</td><td>₹0</td><td>₹0</td></tr>
          </table>
        </body></html>"#,
        per_gram
    ))
}

async fn news_feed() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
    <rss version="2.0"><channel><title>gold price india</title>
      <item><title>Gold prices climb as investors seek safety - Business Wire</title></item>
      <item><title>Gold rate outlook for the coming week - Daily Desk</title></item>
      <item><title>Jewellers report strong demand ahead of weddings - City Post</title></item>
    </channel></rss>"#
}

async fn fx_chart() -> Json<serde_json::Value> {
    Json(json!({"chart": {"result": [{"meta": {"regularMarketPrice": 84.2519}}], "error": null}}))
}

async fn start_fixture() -> (String, Arc<Fixture>) {
    let fixture = Arc::new(Fixture {
        per_gram: AtomicU64::new(0),
    });
    let router = Router::new()
        .route("/rates", get(rate_page))
        .route("/rss", get(news_feed))
        .route("/fx", get(fx_chart))
        .with_state(fixture.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), fixture)
}

fn config_for(base: &str, dir: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.extractor.source_url = format!("{}/rates", base);
    config.fx.url = Some(format!("{}/fx", base));
    config.sentiment.feed_urls = vec![format!("{}/rss", base)];
    config.storage.data_dir = dir.path().join("data");
    config.validate().unwrap();
    config
}

fn day(i: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap() + Days::new(i)
}

fn trend_price(i: u64) -> u64 {
    BASE_PRICE + i * STEP
}

fn seed_ledger(config: &AppConfig, rows: u64) -> Ledger {
    let ledger = Ledger::new(config.storage.ledger_path());
    for i in 0..rows {
        ledger
            .append_if_new(&Observation::new(day(i), trend_price(i)))
            .unwrap();
    }
    ledger
}

fn run_log(config: &AppConfig) -> Vec<RunLogEntry> {
    std::fs::read_to_string(config.storage.run_log_path())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

/// Two consecutive daily runs over a linear-trend ledger
#[tokio::test]
async fn test_end_to_end_trend_forecast_and_self_grading() {
    let (base, fixture) = start_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&base, &dir);
    let ledger = seed_ledger(&config, 59);
    let pipeline = Pipeline::new(config.clone()).unwrap();

    // Day 59: 60th ledger row
    fixture.set_canonical(trend_price(59));
    let outcome = pipeline.run_for(day(59)).await.unwrap();

    let first = match outcome {
        RunOutcome::Recorded {
            observation,
            forecast: Some(forecast),
            forecast_error: None,
        } => {
            assert_eq!(observation.price, trend_price(59));
            assert_eq!(observation.fx_rate, Some(84.25));
            forecast
        }
        other => panic!("expected a recorded run with a forecast, got {:?}", other),
    };

    assert_eq!(ledger.read_all().unwrap().len(), 60);
    assert_eq!(first.forecast_date, day(60));
    assert!(
        first.forecast_price.abs_diff(trend_price(60)) <= 50,
        "forecast {} too far from trend {}",
        first.forecast_price,
        trend_price(60)
    );
    assert_eq!(first.accuracy_last_error, None);

    // Day 60: grades yesterday's prediction
    fixture.set_canonical(trend_price(60));
    let second = match pipeline.run_for(day(60)).await.unwrap() {
        RunOutcome::Recorded {
            forecast: Some(forecast),
            ..
        } => forecast,
        other => panic!("expected a recorded run with a forecast, got {:?}", other),
    };

    assert!(second.scorecard.samples >= 1);
    assert_eq!(
        second.accuracy_last_error,
        Some(trend_price(60) as i64 - first.forecast_price as i64)
    );
    assert_eq!(second.scorecard.win_rate_pct, Some(100.0));
    assert!(second.forecast_price.abs_diff(trend_price(61)) <= 50);

    // Published documents
    let dashboard = ForecastOutput::load(&config.storage.dashboard_path()).unwrap().unwrap();
    assert_eq!(dashboard, second);
    assert_eq!(dashboard.history.prices.len(), 30);

    let mood = SentimentSnapshot::load(&config.storage.mood_path()).unwrap().unwrap();
    assert_eq!(mood.headlines.len(), 2, "meta-news headline must be filtered");

    let log = PredictionLog::load(config.storage.prediction_log_path()).unwrap();
    assert_eq!(log.len(), 2);

    let entries = run_log(&config);
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.outcome == "recorded"));
}

/// Re-running on a recorded date writes nothing
#[tokio::test]
async fn test_second_run_same_day_is_idempotent_skip() {
    let (base, fixture) = start_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&base, &dir);
    let ledger = seed_ledger(&config, 3);
    let pipeline = Pipeline::new(config.clone()).unwrap();

    fixture.set_canonical(trend_price(3));
    let outcome = pipeline.run_for(day(3)).await.unwrap();
    // Too little history to train, but the observation is recorded
    assert!(matches!(
        outcome,
        RunOutcome::Recorded {
            forecast: None,
            forecast_error: Some(_),
            ..
        }
    ));
    let bytes = std::fs::read(ledger.path()).unwrap();

    fixture.set_canonical(trend_price(3) + 5_000);
    let outcome = pipeline.run_for(day(3)).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Skipped { date } if date == day(3)));
    assert_eq!(std::fs::read(ledger.path()).unwrap(), bytes);

    let outcomes: Vec<String> = run_log(&config).into_iter().map(|e| e.outcome).collect();
    assert_eq!(outcomes, vec!["recorded", "skipped"]);
}

/// Out-of-bounds prices are rejected and nothing is stored
#[tokio::test]
async fn test_out_of_bounds_price_stores_nothing() {
    let (base, fixture) = start_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&base, &dir);
    let pipeline = Pipeline::new(config.clone()).unwrap();

    fixture.set_canonical(50_000);
    let outcome = pipeline.run_for(day(0)).await.unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::ExtractionFailed {
            class: FailureClass::Validation,
            ..
        }
    ));
    assert!(!config.storage.ledger_path().exists());
    assert_eq!(run_log(&config)[0].outcome, "extraction_failed");
}

/// Layout drift is a structural failure, not an error exit
#[tokio::test]
async fn test_missing_anchor_is_structural_failure() {
    let (base, _fixture) = start_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&base, &dir);
    let pipeline = Pipeline::new(config.clone()).unwrap();

    match pipeline.run_once().await.unwrap() {
        RunOutcome::ExtractionFailed { class, reason } => {
            assert_eq!(class, FailureClass::StructuralParse);
            assert!(reason.contains("Anchor"), "{}", reason);
        }
        other => panic!("expected ExtractionFailed, got {:?}", other),
    }
    assert!(!config.storage.ledger_path().exists());
}

/// Unreachable source is a transport failure
#[tokio::test]
async fn test_unreachable_source_is_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = config_for(&format!("http://127.0.0.1:{}", port), &dir);
    let pipeline = Pipeline::new(config).unwrap();

    assert!(matches!(
        pipeline.run_once().await.unwrap(),
        RunOutcome::ExtractionFailed {
            class: FailureClass::Transport,
            ..
        }
    ));
}

/// A ledger that cannot be committed aborts the run with an error
#[tokio::test]
async fn test_ledger_persistence_error_propagates() {
    let (base, fixture) = start_fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&base, &dir);

    // data_dir is a regular file, so nothing beneath it can be read or written
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "x").unwrap();
    config.storage.data_dir = blocker;

    let pipeline = Pipeline::new(config).unwrap();
    fixture.set_canonical(trend_price(0));

    assert!(matches!(
        pipeline.run_for(day(0)).await,
        Err(PipelineError::Ledger(_))
    ));
}
