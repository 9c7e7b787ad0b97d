//! Aurum - daily gold price pipeline
//!
//! Extracts one validated price observation per day, commits it to an
//! append-only ledger, scores headline sentiment, and emits a self-graded
//! next-day forecast.

pub mod api;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod extract;
pub mod forecast;
pub mod http;
pub mod sentiment;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use data::{Ledger, Observation, PredictionLog};
pub use error::{FailureClass, PipelineError};
pub use services::pipeline::{Pipeline, RunOutcome};
