use crate::error::ExtractionError;

/// One way of locating the price in the fetched page.
///
/// Strategies return the canonical (per-10g) price; bounds validation is
/// applied by the extractor so every strategy is held to the same limits.
pub trait PriceStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, document: &str) -> Result<u64, ExtractionError>;
}
