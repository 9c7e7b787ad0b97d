//! Price extraction: fetch the rate page, run the strategy chain, validate.

pub mod anchor_table;
pub mod factory;
pub mod fx;
pub mod text_pattern;
pub mod traits;

use chrono::{NaiveDate, Utc};
use reqwest::Client;
use tracing::{info, warn};

use crate::config::{AppConfig, ExtractorConfig};
use crate::constants::events;
use crate::data::Observation;
use crate::error::{ExtractionError, PipelineError};
use crate::http::build_client;

pub use anchor_table::AnchorTableStrategy;
pub use factory::build_strategies;
pub use fx::FxClient;
pub use text_pattern::TextPatternStrategy;
pub use traits::PriceStrategy;

pub struct Extractor {
    client: Client,
    config: ExtractorConfig,
    strategies: Vec<Box<dyn PriceStrategy>>,
    fx: FxClient,
}

impl Extractor {
    pub fn new(config: &AppConfig) -> Result<Self, PipelineError> {
        let strategies = build_strategies(&config.extractor)?;
        Self::with_strategies(config, strategies)
    }

    pub fn with_strategies(
        config: &AppConfig,
        strategies: Vec<Box<dyn PriceStrategy>>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            client: build_client(config.extractor.timeout())?,
            config: config.extractor.clone(),
            strategies,
            fx: FxClient::new(&config.fx)?,
        })
    }

    /// Today's observation, dated in the market's time zone.
    pub async fn extract(&self) -> Result<Observation, ExtractionError> {
        let today = Utc::now()
            .with_timezone(&self.config.market_offset())
            .date_naive();
        self.extract_for(today).await
    }

    pub async fn extract_for(&self, date: NaiveDate) -> Result<Observation, ExtractionError> {
        let document = self.fetch_document().await?;
        let price = self.price_from_document(&document)?;
        let fx_rate = self.fx.fetch_rate().await;

        Ok(Observation::new(date, price)
            .with_fx(fx_rate)
            .observed_at(Utc::now()))
    }

    async fn fetch_document(&self) -> Result<String, ExtractionError> {
        let url = self.config.source_url.as_str();

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExtractionError::transport(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractionError::transport(url, format!("HTTP {}", status)));
        }

        resp.text().await.map_err(|e| ExtractionError::transport(url, e))
    }

    /// Runs the strategy chain over an already-fetched page.
    ///
    /// First in-bounds result wins. When every strategy fails, a bounds
    /// rejection is reported over structural errors; otherwise the primary
    /// strategy's error.
    pub fn price_from_document(&self, document: &str) -> Result<u64, ExtractionError> {
        let mut primary_error = None;
        let mut bounds_error = None;

        for strategy in &self.strategies {
            let err = match strategy.extract(document).and_then(|p| self.validate(p)) {
                Ok(price) => {
                    info!(
                        event = events::OBSERVATION_EXTRACTED,
                        strategy = strategy.name(),
                        price,
                        "💰 [EXTRACT] ₹{} per 10g via {}",
                        price,
                        strategy.name()
                    );
                    return Ok(price);
                }
                Err(e) => e,
            };

            warn!(
                event = events::STRATEGY_FAILED,
                strategy = strategy.name(),
                class = %err.class(),
                "⚠️ [EXTRACT] {} failed: {}",
                strategy.name(),
                err
            );

            if matches!(err, ExtractionError::OutOfBounds { .. }) {
                bounds_error.get_or_insert(err);
            } else if primary_error.is_none() {
                primary_error = Some(err);
            }
        }

        Err(bounds_error
            .or(primary_error)
            .unwrap_or(ExtractionError::PatternNotFound { patterns: 0 }))
    }

    pub fn validate(&self, price: u64) -> Result<u64, ExtractionError> {
        if self.config.in_bounds(price) {
            Ok(price)
        } else {
            Err(ExtractionError::OutOfBounds {
                value: price,
                min: self.config.min_price,
                max: self.config.max_price,
            })
        }
    }
}
