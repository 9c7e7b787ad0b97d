use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One day's canonical price (INR per 10g of 22K gold).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub price: u64,

    /// USD/INR at extraction time, when it could be fetched
    pub fx_rate: Option<f64>,

    /// Set by the extractor; rows read back from the ledger carry None
    #[serde(skip)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl Observation {
    pub fn new(date: NaiveDate, price: u64) -> Self {
        Self {
            date,
            price,
            fx_rate: None,
            observed_at: None,
        }
    }

    pub fn with_fx(mut self, fx_rate: Option<f64>) -> Self {
        self.fx_rate = fx_rate;
        self
    }

    pub fn observed_at(mut self, ts: DateTime<Utc>) -> Self {
        self.observed_at = Some(ts);
        self
    }

    /// Price per gram, as shown next to the canonical 10g figure
    pub fn price_per_gram(&self, unit_ratio: u64) -> u64 {
        self.price / unit_ratio.max(1)
    }
}
