use chrono::NaiveDate;

use crate::config::ForecastConfig;
use crate::data::Observation;

/// Column order of [`FeatureRow::vector`].
pub const FEATURE_NAMES: [&str; 6] = ["prev_close", "usd_inr", "sma_short", "sma_long", "rsi", "sentiment"];

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub close: f64,
    pub prev_close: f64,
    pub fx_rate: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub rsi: f64,
    pub sentiment: f64,
}

impl FeatureRow {
    /// `name=value` pairs in model column order, for debug logs.
    pub fn describe(&self) -> String {
        FEATURE_NAMES
            .iter()
            .zip(self.vector())
            .map(|(name, value)| format!("{}={:.2}", name, value))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn vector(&self) -> Vec<f64> {
        vec![
            self.prev_close,
            self.fx_rate,
            self.sma_short,
            self.sma_long,
            self.rsi,
            self.sentiment,
        ]
    }
}

/// Mean of the `window` values ending at `end` (inclusive).
pub fn sma(prices: &[f64], end: usize, window: usize) -> Option<f64> {
    if window == 0 || end >= prices.len() || end + 1 < window {
        return None;
    }
    let slice = &prices[end + 1 - window..=end];
    Some(slice.iter().sum::<f64>() / window as f64)
}

/// RSI over the `period` day-over-day deltas ending at `end`, using simple
/// means of gains and losses. No losses saturates at 100.
pub fn rsi(prices: &[f64], end: usize, period: usize) -> Option<f64> {
    if period == 0 || end >= prices.len() || end < period {
        return None;
    }

    let (gain, loss) = (end + 1 - period..=end)
        .map(|i| prices[i] - prices[i - 1])
        .fold((0.0, 0.0), |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });

    let (gain, loss) = (gain / period as f64, loss / period as f64);
    if loss == 0.0 {
        return Some(100.0);
    }
    Some(100.0 - 100.0 / (1.0 + gain / loss))
}

/// One row per ledger date with a complete trailing window, oldest first.
/// `sentiment` is applied to the most recent row only.
pub fn build_features(
    history: &[Observation],
    sentiment: f64,
    config: &ForecastConfig,
    fallback_fx: f64,
) -> Vec<FeatureRow> {
    let prices: Vec<f64> = history.iter().map(|o| o.price as f64).collect();
    let last = history.len().saturating_sub(1);

    (config.warmup_rows()..history.len())
        .filter_map(|i| {
            Some(FeatureRow {
                date: history[i].date,
                close: prices[i],
                prev_close: *prices.get(i.checked_sub(1)?)?,
                fx_rate: history[i].fx_rate.unwrap_or(fallback_fx),
                sma_short: sma(&prices, i, config.short_window)?,
                sma_long: sma(&prices, i, config.long_window)?,
                rsi: rsi(&prices, i, config.rsi_period)?,
                sentiment: if i == last { sentiment } else { 0.0 },
            })
        })
        .collect()
}
