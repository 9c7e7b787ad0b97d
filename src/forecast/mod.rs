//! Next-day forecast with self-grading against the prediction log.

pub mod features;
pub mod forest;
pub mod grading;
pub mod types;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ForecastConfig};
use crate::constants::{events, forecast::{RSI_OVERBOUGHT, RSI_OVERSOLD}};
use crate::data::{Observation, PredictionLog, PredictionRecord};
use crate::error::ForecastError;
use crate::sentiment::SentimentSnapshot;

pub use features::{build_features, FeatureRow};
pub use forest::{ForestParams, RandomForest};
pub use grading::{grade_today, GradedPrediction, Scorecard};
pub use types::{ForecastOutput, PriceHistory, TrendSignal, VolatilityStatus};

pub struct ForecastEngine {
    config: ForecastConfig,
    unit_ratio: u64,
    fallback_fx: f64,
    prediction_log_path: PathBuf,
}

impl ForecastEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.forecast.clone(),
            unit_ratio: config.extractor.unit_ratio,
            fallback_fx: config.fx.fallback_rate,
            prediction_log_path: config.storage.prediction_log_path(),
        }
    }

    pub fn run(&self, history: &[Observation], sentiment: &SentimentSnapshot) -> Result<ForecastOutput, ForecastError> {
        self.run_at(history, sentiment, Utc::now())
    }

    /// Grades today's logged prediction, trains on the full history and logs
    /// tomorrow's prediction. "Today" is the latest ledger date.
    pub fn run_at(
        &self,
        history: &[Observation],
        sentiment: &SentimentSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ForecastOutput, ForecastError> {
        let need = self.config.min_feature_rows;
        let Some(today) = history.last() else {
            return Err(self.skip(0, need));
        };

        let mut log = PredictionLog::load(&self.prediction_log_path)?;

        let graded = grade_today(&log, today);
        if let Some(g) = &graded {
            info!(
                event = events::PREDICTION_GRADED,
                date = %g.date,
                predicted = g.predicted,
                actual = g.actual,
                error = g.error,
                "🎯 [FORECAST] {}: predicted ₹{} vs actual ₹{} (error {:+})",
                g.date,
                g.predicted,
                g.actual,
                g.error
            );
        }

        let rows = build_features(history, sentiment.mood_score, &self.config, self.fallback_fx);
        if rows.len() < need {
            return Err(self.skip(rows.len(), need));
        }

        let forecast = self.predict_next(&rows)?;
        let tomorrow = today
            .date
            .succ_opt()
            .ok_or_else(|| ForecastError::Model(format!("no calendar day after {}", today.date)))?;

        log.record(PredictionRecord {
            target_date: tomorrow,
            predicted_price: forecast,
        });
        log.save()?;

        let scorecard = Scorecard::compute(&log, history);
        let latest = &rows[rows.len() - 1];

        info!(
            event = events::FORECAST_EMITTED,
            date = %tomorrow,
            forecast,
            samples = scorecard.samples,
            "🌲 [FORECAST] {} → ₹{} (10g), trained on {} rows",
            tomorrow,
            forecast,
            rows.len() - 1
        );

        let window_start = history.len().saturating_sub(self.config.history_window);
        let window = &history[window_start..];

        Ok(ForecastOutput {
            generated_at: now,
            current_date: today.date,
            current_price: today.price,
            current_price_per_gram: today.price_per_gram(self.unit_ratio),
            previous_price: history.len().checked_sub(2).map(|i| history[i].price),
            forecast_date: tomorrow,
            forecast_price: forecast,
            forecast_price_per_gram: forecast / self.unit_ratio.max(1),
            accuracy_last_error: graded.map(|g| g.error),
            scorecard,
            trend_signal: TrendSignal::from_averages(latest.sma_short, latest.sma_long),
            volatility_status: if latest.rsi > RSI_OVERBOUGHT || latest.rsi < RSI_OVERSOLD {
                VolatilityStatus::High
            } else {
                VolatilityStatus::Stable
            },
            rsi: (latest.rsi * 100.0).round() / 100.0,
            sma_short: latest.sma_short,
            sma_long: latest.sma_long,
            sentiment_score: latest.sentiment,
            history: PriceHistory {
                dates: window.iter().map(|o| o.date).collect(),
                prices: window.iter().map(|o| o.price).collect(),
            },
        })
    }

    /// Pairs features at t-1 with the move to t, then predicts the next move
    /// from the latest row.
    fn predict_next(&self, rows: &[FeatureRow]) -> Result<u64, ForecastError> {
        let (x, y): (Vec<Vec<f64>>, Vec<f64>) = rows
            .windows(2)
            .map(|pair| (pair[0].vector(), pair[1].close - pair[0].close))
            .unzip();

        let forest = RandomForest::fit(&x, &y, &ForestParams::from(&self.config))?;

        let latest = &rows[rows.len() - 1];
        debug!("[FORECAST] Latest features {}: {}", latest.date, latest.describe());
        let predicted = latest.close + forest.predict(&latest.vector());
        if !predicted.is_finite() || predicted < 1.0 {
            return Err(ForecastError::Model(format!("non-positive forecast {}", predicted)));
        }
        Ok(predicted.round() as u64)
    }

    fn skip(&self, have: usize, need: usize) -> ForecastError {
        warn!(
            event = events::FORECAST_SKIPPED,
            have,
            need,
            "⚠️ [FORECAST] Not enough history ({} usable rows, need {}) - no prediction",
            have,
            need
        );
        ForecastError::InsufficientHistory { have, need }
    }
}
