use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::grading::Scorecard;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendSignal {
    Bullish,
    Bearish,
}

impl TrendSignal {
    pub fn from_averages(sma_short: f64, sma_long: f64) -> Self {
        if sma_short > sma_long {
            TrendSignal::Bullish
        } else {
            TrendSignal::Bearish
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityStatus {
    High,
    Stable,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<u64>,
}

/// Dashboard document. Re-derivable from the ledger, prediction log and
/// sentiment snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutput {
    pub generated_at: DateTime<Utc>,
    pub current_date: NaiveDate,
    pub current_price: u64,
    pub current_price_per_gram: u64,
    pub previous_price: Option<u64>,
    pub forecast_date: NaiveDate,
    pub forecast_price: u64,
    pub forecast_price_per_gram: u64,
    /// actual - predicted for today's logged prediction
    pub accuracy_last_error: Option<i64>,
    pub scorecard: Scorecard,
    pub trend_signal: TrendSignal,
    pub volatility_status: VolatilityStatus,
    pub rsi: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub sentiment_score: f64,
    pub history: PriceHistory,
}

impl ForecastOutput {
    pub fn load(path: &std::path::Path) -> Result<Option<Self>, crate::error::ForecastError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
