pub mod atomic;
pub mod ledger;
pub mod prediction_log;
pub mod types;

pub use ledger::Ledger;
pub use prediction_log::{PredictionLog, PredictionRecord};
pub use types::Observation;
