//! Anchor heading → next table → unit row.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::traits::PriceStrategy;
use crate::config::ExtractorConfig;
use crate::constants::extract::MAX_DIAGNOSTIC_CANDIDATES;
use crate::error::ExtractionError;

/// "1", "1g", "1 gm", "1 gram", ...
static UNIT_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1\s*(g|gm|gms|gram|grams)?$").unwrap());

const ANCHOR_CANDIDATES: &str = "h1, h2, h3, h4, div, span";
const HEADINGS: &str = "h1, h2, h3, h4";

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Visible text with whitespace runs collapsed to single spaces.
pub(crate) fn normalized_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone, Debug)]
pub struct AnchorTableStrategy {
    keywords: Vec<String>,
    max_len: usize,
    unit_ratio: u64,
}

impl AnchorTableStrategy {
    pub fn new(keywords: &[String], max_len: usize, unit_ratio: u64) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            max_len,
            unit_ratio,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(&config.anchor_keywords, config.anchor_max_len, config.unit_ratio)
    }

    /// Every keyword must be present and the text short enough to be a heading.
    pub fn is_anchor_text(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        text.chars().count() < self.max_len && self.keywords.iter().all(|k| text.contains(k.as_str()))
    }

    fn find_anchor<'a>(&self, doc: &'a Html) -> Result<ElementRef<'a>, ExtractionError> {
        let candidates = selector(ANCHOR_CANDIDATES);
        doc.select(&candidates)
            .find(|el| self.is_anchor_text(&normalized_text(*el)))
            .ok_or_else(|| ExtractionError::AnchorNotFound {
                candidates: heading_texts(doc),
            })
    }

    /// Per-gram price from the first unit row, or the labels seen for diagnosis.
    fn unit_price(table: ElementRef<'_>) -> Result<u64, Vec<String>> {
        let rows = selector("tr");
        let cells = selector("td, th");
        let mut labels = Vec::new();

        for row in table.select(&rows) {
            let row_cells: Vec<ElementRef<'_>> = row.select(&cells).collect();
            if row_cells.len() < 2 {
                continue;
            }

            let label = normalized_text(row_cells[0]).to_lowercase();
            let is_unit_row = UNIT_ROW.is_match(&label);
            if labels.len() < MAX_DIAGNOSTIC_CANDIDATES {
                labels.push(label);
            }
            if !is_unit_row {
                continue;
            }

            let digits: String = normalized_text(row_cells[1])
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            if let Ok(value) = digits.parse::<u64>() {
                return Ok(value);
            }
        }

        Err(labels)
    }
}

impl PriceStrategy for AnchorTableStrategy {
    fn name(&self) -> &'static str {
        "anchor_table"
    }

    fn extract(&self, document: &str) -> Result<u64, ExtractionError> {
        let doc = Html::parse_document(document);

        let anchor = self.find_anchor(&doc)?;
        let anchor_text = normalized_text(anchor);

        let table = next_table(&doc, anchor).ok_or_else(|| ExtractionError::TableNotFound {
            anchor: anchor_text.clone(),
        })?;

        let per_unit = Self::unit_price(table)
            .map_err(|labels| ExtractionError::PriceRowNotFound { labels })?;

        Ok(per_unit.saturating_mul(self.unit_ratio))
    }
}

/// First `<table>` after the anchor in document order (descendants included).
fn next_table<'a>(doc: &'a Html, anchor: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let anchor_id = anchor.id();
    doc.tree
        .root()
        .descendants()
        .skip_while(|node| node.id() != anchor_id)
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

fn heading_texts(doc: &Html) -> Vec<String> {
    let headings = selector(HEADINGS);
    doc.select(&headings)
        .map(normalized_text)
        .filter(|t| !t.is_empty())
        .take(MAX_DIAGNOSTIC_CANDIDATES)
        .collect()
}
