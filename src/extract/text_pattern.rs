//! Regex over the page's flattened text. Survives markup changes that break
//! the anchor/table walk, at the cost of depending on the page's wording.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use super::anchor_table::normalized_text;
use super::traits::PriceStrategy;
use crate::error::ExtractionError;

/// "₹12,700 per gram for 22 karat" (per-gram figure)
static PER_GRAM_SENTENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)₹\s*([\d,]+)\s*per\s+gram\s+for\s+22\s*(?:karat|carat|k)").unwrap()
});

/// "22 Carat ... 10 gram ... ₹ 1,27,000" (already per 10g)
static TEN_GRAM_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)22\s*(?:carat|karat).*?10\s*gram.*?₹\s*([\d,]+)").unwrap());

struct TextPattern {
    regex: &'static Regex,
    multiplier: u64,
}

pub struct TextPatternStrategy {
    patterns: Vec<TextPattern>,
}

impl TextPatternStrategy {
    pub fn new(unit_ratio: u64) -> Self {
        Self {
            patterns: vec![
                TextPattern {
                    regex: &PER_GRAM_SENTENCE,
                    multiplier: unit_ratio,
                },
                TextPattern {
                    regex: &TEN_GRAM_ROW,
                    multiplier: 1,
                },
            ],
        }
    }
}

impl PriceStrategy for TextPatternStrategy {
    fn name(&self) -> &'static str {
        "text_pattern"
    }

    fn extract(&self, document: &str) -> Result<u64, ExtractionError> {
        let doc = Html::parse_document(document);
        let text = normalized_text(doc.root_element());

        for pattern in &self.patterns {
            let Some(caps) = pattern.regex.captures(&text) else {
                continue;
            };
            let digits: String = caps[1].chars().filter(char::is_ascii_digit).collect();
            if let Ok(value) = digits.parse::<u64>() {
                return Ok(value.saturating_mul(pattern.multiplier));
            }
        }

        Err(ExtractionError::PatternNotFound {
            patterns: self.patterns.len(),
        })
    }
}
