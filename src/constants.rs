//! Application-wide constants and magic numbers
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make the pipeline easier to tune. Every value here is a default that
//! `AppConfig` can override.

use std::time::Duration;

/// Price extraction defaults
pub mod extract {
    use super::*;

    /// Retail rate page (22K, Chennai)
    pub const SOURCE_URL: &str = "https://www.goodreturns.in/gold-rates/chennai.html";

    /// Bounded timeout for the page fetch
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

    /// Every keyword must appear in the anchor heading text
    pub const ANCHOR_KEYWORDS: &[&str] = &["today", "22", "gram"];

    /// Longer texts are whole-page containers, not headings
    pub const ANCHOR_MAX_LEN: usize = 150;

    /// Per-gram price → canonical per-10g price
    pub const UNIT_RATIO: u64 = 10;

    /// Sanity bounds for the canonical (10g, INR) price
    pub const MIN_PRICE: u64 = 80_000;
    pub const MAX_PRICE: u64 = 200_000;

    /// Cap on diagnostic candidates carried in errors
    pub const MAX_DIAGNOSTIC_CANDIDATES: usize = 25;

    /// Calendar dates are taken in IST
    pub const MARKET_UTC_OFFSET_MINUTES: i32 = 330;

    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
    pub const ACCEPT_LANGUAGE: &str = "en-IN,en;q=0.9";
}

/// Exchange-rate defaults
pub mod fx {
    use super::*;

    pub const RATE_URL: &str =
        "https://query1.finance.yahoo.com/v8/finance/chart/INR=X?interval=1d&range=1d";

    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

    /// Feature value used when a ledger row has no rate
    pub const FALLBACK_RATE: f64 = 84.0;
}

/// Forecast engine defaults
pub mod forecast {
    pub const SHORT_WINDOW: usize = 5;
    pub const LONG_WINDOW: usize = 15;
    pub const RSI_PERIOD: usize = 14;

    /// Minimum usable feature rows before training
    pub const MIN_FEATURE_ROWS: usize = 45;

    pub const N_TREES: usize = 100;
    pub const MAX_DEPTH: usize = 10;
    pub const MIN_SAMPLES_SPLIT: usize = 2;
    pub const SEED: u64 = 42;

    /// Trailing observations in the dashboard document
    pub const HISTORY_WINDOW: usize = 30;

    /// RSI outside these bands marks the market as volatile
    pub const RSI_OVERBOUGHT: f64 = 70.0;
    pub const RSI_OVERSOLD: f64 = 30.0;
}

/// Sentiment scorer defaults
pub mod sentiment {
    use super::*;

    pub const FEED_URLS: &[&str] =
        &["https://news.google.com/rss/search?q=gold+price+india&hl=en-IN&gl=IN&ceid=IN:en"];

    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

    /// Items taken from the top of each feed
    pub const MAX_ITEMS_PER_FEED: usize = 8;

    /// Titles this short are feed noise
    pub const MIN_TITLE_LEN: usize = 10;

    /// Meta-news is skipped to avoid scoring other people's forecasts
    pub const META_KEYWORDS: &[&str] = &["prediction", "forecast", "outlook", "opinion"];

    pub const CONFLICT_KEYWORDS: &[&str] = &[
        "war", "wars", "conflict", "crisis", "attack", "attacks", "missile", "tension",
        "tensions", "sanctions", "invasion", "geopolitical", "terror",
    ];

    /// Festival and wedding season months (1 = January)
    pub const SEASONAL_MONTHS: &[u32] = &[10, 11];
    pub const SEASONAL_OFFSET: f64 = 0.1;

    pub const RISK_ON_THRESHOLD: f64 = 0.05;
    pub const RISK_OFF_THRESHOLD: f64 = -0.05;

    pub const SAFE_HAVEN_TAG: &str = "SAFE_HAVEN";
    pub const SEASONAL_TAG: &str = "SEASONAL_DEMAND";

    /// Source used when the feed item carries none
    pub const DEFAULT_SOURCE: &str = "Google News";
}

/// On-disk layout defaults
pub mod storage {
    pub const DATA_DIR: &str = "data";
    pub const LEDGER_FILE: &str = "gold_prices.csv";
    pub const PREDICTION_LOG_FILE: &str = "prediction_log.json";
    pub const MOOD_FILE: &str = "market_mood.json";
    pub const DASHBOARD_FILE: &str = "dashboard_data.json";
    pub const RUN_LOG_FILE: &str = "run_log.jsonl";
    /// Written next to the run log
    pub const RUN_SUMMARY_FILE: &str = "run_summary.json";
}

/// Scheduler and API defaults
pub mod runtime {
    /// 06:30 IST (01:00 UTC), seconds-resolution cron
    pub const DAILY_CRON: &str = "0 0 1 * * *";
    pub const API_BIND: &str = "0.0.0.0:3000";
    pub const CONFIG_PATH: &str = "config.yaml";
    pub const CONFIG_ENV: &str = "AURUM_CONFIG";
}

/// Logging event names for structured logging
pub mod events {
    pub const OBSERVATION_EXTRACTED: &str = "observation_extracted";
    pub const STRATEGY_FAILED: &str = "strategy_failed";
    pub const EXTRACTION_FAILED: &str = "extraction_failed";
    pub const OBSERVATION_RECORDED: &str = "observation_recorded";
    pub const IDEMPOTENT_SKIP: &str = "idempotent_skip";
    pub const MOOD_SCORED: &str = "mood_scored";
    pub const FEED_FAILED: &str = "feed_failed";
    pub const PREDICTION_GRADED: &str = "prediction_graded";
    pub const FORECAST_EMITTED: &str = "forecast_emitted";
    pub const FORECAST_SKIPPED: &str = "forecast_skipped";
    pub const FX_UNAVAILABLE: &str = "fx_unavailable";
}
