use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use tracing::info;
use url::Url;

use crate::constants;
use crate::error::ConfigError;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub source_url: String,
    pub timeout_secs: u64,

    /// Strategy names tried in order ("anchor_table", "text_pattern")
    pub strategies: Vec<String>,

    pub anchor_keywords: Vec<String>,
    pub anchor_max_len: usize,

    pub unit_ratio: u64,
    pub min_price: u64,
    pub max_price: u64,

    /// Offset of the market's calendar day from UTC
    pub utc_offset_minutes: i32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            source_url: constants::extract::SOURCE_URL.to_string(),
            timeout_secs: constants::extract::FETCH_TIMEOUT.as_secs(),
            strategies: strings(&["anchor_table", "text_pattern"]),
            anchor_keywords: strings(constants::extract::ANCHOR_KEYWORDS),
            anchor_max_len: constants::extract::ANCHOR_MAX_LEN,
            unit_ratio: constants::extract::UNIT_RATIO,
            min_price: constants::extract::MIN_PRICE,
            max_price: constants::extract::MAX_PRICE,
            utc_offset_minutes: constants::extract::MARKET_UTC_OFFSET_MINUTES,
        }
    }
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn market_offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes).unwrap_or_else(|| Utc.fix())
    }

    pub fn in_bounds(&self, price: u64) -> bool {
        (self.min_price..=self.max_price).contains(&price)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    /// None disables the exchange-rate fetch
    pub url: Option<String>,
    pub timeout_secs: u64,
    pub fallback_rate: f64,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            url: Some(constants::fx::RATE_URL.to_string()),
            timeout_secs: constants::fx::FETCH_TIMEOUT.as_secs(),
            fallback_rate: constants::fx::FALLBACK_RATE,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub min_feature_rows: usize,
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
    pub history_window: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            short_window: constants::forecast::SHORT_WINDOW,
            long_window: constants::forecast::LONG_WINDOW,
            rsi_period: constants::forecast::RSI_PERIOD,
            min_feature_rows: constants::forecast::MIN_FEATURE_ROWS,
            n_trees: constants::forecast::N_TREES,
            max_depth: constants::forecast::MAX_DEPTH,
            min_samples_split: constants::forecast::MIN_SAMPLES_SPLIT,
            seed: constants::forecast::SEED,
            history_window: constants::forecast::HISTORY_WINDOW,
        }
    }
}

impl ForecastConfig {
    /// Index of the first row with a complete trailing window
    pub fn warmup_rows(&self) -> usize {
        self.long_window
            .saturating_sub(1)
            .max(self.short_window.saturating_sub(1))
            .max(self.rsi_period)
            .max(1)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub feed_urls: Vec<String>,
    pub timeout_secs: u64,
    pub max_items_per_feed: usize,
    pub min_title_len: usize,
    pub meta_keywords: Vec<String>,
    pub conflict_keywords: Vec<String>,
    pub seasonal_months: Vec<u32>,
    pub seasonal_offset: f64,
    pub risk_on_threshold: f64,
    pub risk_off_threshold: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            feed_urls: strings(constants::sentiment::FEED_URLS),
            timeout_secs: constants::sentiment::FETCH_TIMEOUT.as_secs(),
            max_items_per_feed: constants::sentiment::MAX_ITEMS_PER_FEED,
            min_title_len: constants::sentiment::MIN_TITLE_LEN,
            meta_keywords: strings(constants::sentiment::META_KEYWORDS),
            conflict_keywords: strings(constants::sentiment::CONFLICT_KEYWORDS),
            seasonal_months: constants::sentiment::SEASONAL_MONTHS.to_vec(),
            seasonal_offset: constants::sentiment::SEASONAL_OFFSET,
            risk_on_threshold: constants::sentiment::RISK_ON_THRESHOLD,
            risk_off_threshold: constants::sentiment::RISK_OFF_THRESHOLD,
        }
    }
}

impl SentimentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub prediction_log_file: String,
    pub mood_file: String,
    pub dashboard_file: String,
    pub run_log_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(constants::storage::DATA_DIR),
            ledger_file: constants::storage::LEDGER_FILE.to_string(),
            prediction_log_file: constants::storage::PREDICTION_LOG_FILE.to_string(),
            mood_file: constants::storage::MOOD_FILE.to_string(),
            dashboard_file: constants::storage::DASHBOARD_FILE.to_string(),
            run_log_file: constants::storage::RUN_LOG_FILE.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    pub fn prediction_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.prediction_log_file)
    }

    pub fn mood_path(&self) -> PathBuf {
        self.data_dir.join(&self.mood_file)
    }

    pub fn dashboard_path(&self) -> PathBuf {
        self.data_dir.join(&self.dashboard_file)
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.run_log_file)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub daily_cron: String,
    pub api_bind: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            daily_cron: constants::runtime::DAILY_CRON.to_string(),
            api_bind: constants::runtime::API_BIND.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extractor: ExtractorConfig,
    pub fx: FxConfig,
    pub forecast: ForecastConfig,
    pub sentiment: SentimentConfig,
    pub storage: StorageConfig,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Load from `$AURUM_CONFIG` or `config.yaml`; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(constants::runtime::CONFIG_ENV)
            .unwrap_or_else(|_| constants::runtime::CONFIG_PATH.to_string());
        let path = Path::new(&path);

        if !path.exists() {
            info!("ℹ️ {} not found - using built-in defaults", path.display());
            let config = AppConfig::default();
            config.validate()?;
            return Ok(config);
        }

        Self::from_path(path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let config: AppConfig = if content.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ex = &self.extractor;
        if ex.min_price == 0 || ex.min_price >= ex.max_price {
            return Err(ConfigError::Invalid(format!(
                "price bounds must satisfy 0 < min < max (got [{}, {}])",
                ex.min_price, ex.max_price
            )));
        }
        if ex.unit_ratio == 0 {
            return Err(ConfigError::Invalid("unit_ratio must be positive".into()));
        }
        if ex.anchor_keywords.is_empty() {
            return Err(ConfigError::Invalid("anchor_keywords must not be empty".into()));
        }
        if ex.strategies.is_empty() {
            return Err(ConfigError::Invalid("at least one extraction strategy is required".into()));
        }
        crate::extract::build_strategies(ex)?;
        if offset_from_minutes(ex.utc_offset_minutes).is_none() {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes out of range: {}",
                ex.utc_offset_minutes
            )));
        }
        check_url("extractor.source_url", &ex.source_url)?;

        if let Some(fx_url) = &self.fx.url {
            check_url("fx.url", fx_url)?;
        }
        if self.fx.fallback_rate <= 0.0 {
            return Err(ConfigError::Invalid("fx.fallback_rate must be positive".into()));
        }

        let fc = &self.forecast;
        if fc.short_window == 0 || fc.short_window >= fc.long_window {
            return Err(ConfigError::Invalid(format!(
                "forecast windows must satisfy 0 < short < long (got {} / {})",
                fc.short_window, fc.long_window
            )));
        }
        if fc.rsi_period == 0 || fc.n_trees == 0 || fc.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "rsi_period, n_trees and max_depth must be positive".into(),
            ));
        }
        if fc.min_feature_rows < 2 {
            return Err(ConfigError::Invalid("min_feature_rows must be at least 2".into()));
        }

        let st = &self.sentiment;
        for feed in &st.feed_urls {
            check_url("sentiment.feed_urls", feed)?;
        }
        if st.risk_off_threshold > st.risk_on_threshold {
            return Err(ConfigError::Invalid(
                "risk_off_threshold must not exceed risk_on_threshold".into(),
            ));
        }
        if let Some(m) = st.seasonal_months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(ConfigError::Invalid(format!("invalid seasonal month: {}", m)));
        }

        Ok(())
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::Invalid(format!("{} is not a valid URL ({}): {}", field, value, e)))
}
