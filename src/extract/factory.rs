use crate::config::ExtractorConfig;
use crate::error::ConfigError;

use super::{
    anchor_table::AnchorTableStrategy, text_pattern::TextPatternStrategy, traits::PriceStrategy,
};

/// Builds the ordered strategy chain named in `config.strategies`.
pub fn build_strategies(config: &ExtractorConfig) -> Result<Vec<Box<dyn PriceStrategy>>, ConfigError> {
    config
        .strategies
        .iter()
        .map(|name| -> Result<Box<dyn PriceStrategy>, ConfigError> {
            match name.to_lowercase().as_str() {
                "anchor_table" => Ok(Box::new(AnchorTableStrategy::from_config(config))),
                "text_pattern" => Ok(Box::new(TextPatternStrategy::new(config.unit_ratio))),
                other => Err(ConfigError::Invalid(format!(
                    "Unknown extraction strategy '{}' (expected anchor_table|text_pattern)",
                    other
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_order() {
        let chain = build_strategies(&ExtractorConfig::default()).unwrap();
        let names: Vec<&str> = chain.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["anchor_table", "text_pattern"]);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let config = ExtractorConfig {
            strategies: vec!["anchor_table".into(), "ocr".into()],
            ..ExtractorConfig::default()
        };
        assert!(matches!(build_strategies(&config), Err(ConfigError::Invalid(_))));
    }
}
