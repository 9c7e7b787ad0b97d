//! Custom error types for the pipeline
//!
//! Provides structured, typed errors per component instead of generic Box<dyn Error>

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Coarse failure taxonomy used for logging and the run log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Network, timeout or HTTP status. Retried only by the next scheduled run.
    Transport,
    /// Anchor, table, row or pattern not found. Usually upstream layout drift.
    StructuralParse,
    /// Value outside sanity bounds.
    Validation,
    /// I/O failure while reading or committing state.
    Persistence,
    /// Not enough history to train.
    Model,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Transport => "transport",
            FailureClass::StructuralParse => "structural_parse",
            FailureClass::Validation => "validation",
            FailureClass::Persistence => "persistence",
            FailureClass::Model => "model",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Anchor heading not found ({} candidate headings)", candidates.len())]
    AnchorNotFound { candidates: Vec<String> },

    #[error("No table found after anchor '{anchor}'")]
    TableNotFound { anchor: String },

    #[error("Unit price row not found (row labels: {labels:?})")]
    PriceRowNotFound { labels: Vec<String> },

    #[error("No price pattern matched page text ({patterns} patterns tried)")]
    PatternNotFound { patterns: usize },

    #[error("Price {value} outside bounds [{min}, {max}]")]
    OutOfBounds { value: u64, min: u64, max: u64 },
}

impl ExtractionError {
    pub fn class(&self) -> FailureClass {
        match self {
            ExtractionError::Transport { .. } => FailureClass::Transport,
            ExtractionError::OutOfBounds { .. } => FailureClass::Validation,
            ExtractionError::AnchorNotFound { .. }
            | ExtractionError::TableNotFound { .. }
            | ExtractionError::PriceRowNotFound { .. }
            | ExtractionError::PatternNotFound { .. } => FailureClass::StructuralParse,
        }
    }

    pub(crate) fn transport(url: &str, reason: impl fmt::Display) -> Self {
        ExtractionError::Transport {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Ledger read/commit errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unrecognized ledger header: {found:?}")]
    Schema { found: Vec<String> },

    #[error("Ledger out of order at row {row}: {date} does not follow {previous}")]
    OutOfOrder {
        row: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("Invalid price {price} for {date}")]
    InvalidPrice { date: NaiveDate, price: u64 },
}

impl LedgerError {
    pub fn class(&self) -> FailureClass {
        FailureClass::Persistence
    }
}

/// Forecast engine errors
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Not enough history: have {have} usable rows, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Prediction log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Prediction log is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForecastError {
    pub fn class(&self) -> FailureClass {
        match self {
            ForecastError::InsufficientHistory { .. } | ForecastError::Model(_) => FailureClass::Model,
            ForecastError::Io(_) | ForecastError::Json(_) => FailureClass::Persistence,
        }
    }
}

/// Headline feed errors. These never escape the sentiment scorer.
#[derive(Error, Debug)]
pub enum SentimentError {
    #[error("Feed transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Feed parse error for {url}: {reason}")]
    Feed { url: String, reason: String },

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level errors that abort a pipeline invocation
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
