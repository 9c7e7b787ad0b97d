use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::FxConfig;
use crate::constants::events;
use crate::http::build_client;

/// Best-effort USD/INR lookup. Failures are logged and reported as `None`;
/// they never fail an extraction.
#[derive(Clone)]
pub struct FxClient {
    client: Client,
    url: Option<String>,
}

impl FxClient {
    pub fn new(config: &FxConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(std::time::Duration::from_secs(config.timeout_secs))?,
            url: config.url.clone(),
        })
    }

    pub async fn fetch_rate(&self) -> Option<f64> {
        let url = self.url.as_deref()?;

        let body = match self.fetch_json(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(event = events::FX_UNAVAILABLE, "⚠️ [FX] Rate fetch failed: {}", e);
                return None;
            }
        };

        match parse_chart_rate(&body) {
            Some(rate) => {
                debug!("[FX] USD/INR = {}", rate);
                Some(rate)
            }
            None => {
                warn!(event = events::FX_UNAVAILABLE, "⚠️ [FX] No rate in chart response");
                None
            }
        }
    }

    async fn fetch_json(&self, url: &str) -> reqwest::Result<Value> {
        self.client.get(url).send().await?.error_for_status()?.json().await
    }
}

/// Reads `chart.result[0].meta.regularMarketPrice`, falling back to the last
/// non-null close. Rounded to 2 decimals.
pub fn parse_chart_rate(body: &Value) -> Option<f64> {
    let result = body.pointer("/chart/result/0")?;

    let rate = result
        .pointer("/meta/regularMarketPrice")
        .and_then(Value::as_f64)
        .or_else(|| {
            result
                .pointer("/indicators/quote/0/close")
                .and_then(Value::as_array)?
                .iter()
                .rev()
                .find_map(Value::as_f64)
        })?;

    (rate.is_finite() && rate > 0.0).then(|| (rate * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_regular_market_price() {
        let body = json!({"chart": {"result": [{"meta": {"regularMarketPrice": 84.1234}}]}});
        assert_eq!(parse_chart_rate(&body), Some(84.12));
    }

    #[test]
    fn test_falls_back_to_last_close() {
        let body = json!({"chart": {"result": [{
            "meta": {},
            "indicators": {"quote": [{"close": [83.5, 83.91, null]}]}
        }]}});
        assert_eq!(parse_chart_rate(&body), Some(83.91));
    }

    #[test]
    fn test_missing_result() {
        assert_eq!(parse_chart_rate(&json!({"chart": {"result": null, "error": "x"}})), None);
        assert_eq!(parse_chart_rate(&json!({"chart": {"result": [{"meta": {"regularMarketPrice": 0.0}}]}})), None);
    }

    #[tokio::test]
    async fn test_disabled_client_yields_none() {
        let client = FxClient::new(&FxConfig {
            url: None,
            ..FxConfig::default()
        })
        .unwrap();
        assert_eq!(client.fetch_rate().await, None);
    }
}
