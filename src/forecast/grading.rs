use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{Observation, PredictionLog};

/// A logged prediction matched with its ledger truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GradedPrediction {
    pub date: NaiveDate,
    pub predicted: u64,
    pub actual: u64,
    /// actual - predicted
    pub error: i64,
}

/// Grades the prediction that was logged for `today`, if any.
pub fn grade_today(log: &PredictionLog, today: &Observation) -> Option<GradedPrediction> {
    let record = log.get(today.date)?;
    Some(GradedPrediction {
        date: today.date,
        predicted: record.predicted_price,
        actual: today.price,
        error: today.price as i64 - record.predicted_price as i64,
    })
}

/// Rolling accuracy over every logged prediction with known ground truth.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub samples: usize,
    pub mae: Option<f64>,
    pub mape_pct: Option<f64>,
    pub win_rate_pct: Option<f64>,
    /// Samples with a previous ledger price to measure direction against
    pub directional_samples: usize,
}

impl Scorecard {
    pub fn compute(log: &PredictionLog, history: &[Observation]) -> Self {
        let index: HashMap<NaiveDate, usize> =
            history.iter().enumerate().map(|(i, o)| (o.date, i)).collect();

        let mut samples = 0usize;
        let mut abs_err = 0.0;
        let mut pct_err = 0.0;
        let mut directional = 0usize;
        let mut wins = 0usize;

        for record in log.records() {
            let Some(&i) = index.get(&record.target_date) else {
                continue;
            };
            let actual = history[i].price;
            let predicted = record.predicted_price;

            samples += 1;
            let err = actual.abs_diff(predicted) as f64;
            abs_err += err;
            pct_err += err / actual.max(1) as f64 * 100.0;

            if let Some(prev) = i.checked_sub(1).map(|p| history[p].price) {
                directional += 1;
                if predicted.cmp(&prev) == actual.cmp(&prev) {
                    wins += 1;
                }
            }
        }

        if samples == 0 {
            return Self::default();
        }

        let n = samples as f64;
        Self {
            samples,
            mae: Some(abs_err / n),
            mape_pct: Some(pct_err / n),
            win_rate_pct: (directional > 0).then(|| wins as f64 / directional as f64 * 100.0),
            directional_samples: directional,
        }
    }
}
