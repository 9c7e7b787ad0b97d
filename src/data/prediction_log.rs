use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::atomic::write_json_atomic;
use crate::error::ForecastError;

/// A forecast awaiting (or matched with) its ground truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub target_date: NaiveDate,
    pub predicted_price: u64,
}

/// Date-keyed mapping of predicted canonical prices, persisted as
/// `{"YYYY-MM-DD": price}`. Entries are never pruned.
#[derive(Clone, Debug)]
pub struct PredictionLog {
    path: PathBuf,
    entries: BTreeMap<NaiveDate, u64>,
}

impl PredictionLog {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the log; a missing file is an empty log.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ForecastError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, date: NaiveDate) -> Option<PredictionRecord> {
        self.entries.get(&date).map(|&predicted_price| PredictionRecord {
            target_date: date,
            predicted_price,
        })
    }

    /// Records a prediction in memory; call [`PredictionLog::save`] to commit.
    pub fn record(&mut self, record: PredictionRecord) {
        if let Some(previous) = self.entries.insert(record.target_date, record.predicted_price) {
            if previous != record.predicted_price {
                warn!(
                    "[PREDICTION LOG] Replacing prediction for {}: ₹{} -> ₹{}",
                    record.target_date, previous, record.predicted_price
                );
            }
        }
    }

    pub fn records(&self) -> impl Iterator<Item = PredictionRecord> + '_ {
        self.entries.iter().map(|(&target_date, &predicted_price)| PredictionRecord {
            target_date,
            predicted_price,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<(), ForecastError> {
        write_json_atomic(&self.path, &self.entries)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = PredictionLog::load(dir.path().join("prediction_log.json")).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_reads_date_keyed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prediction_log.json");
        fs::write(&path, r#"{"2025-12-26": 127500, "2025-12-27": 127900}"#).unwrap();

        let log = PredictionLog::load(&path).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(date(2025, 12, 26)).unwrap().predicted_price, 127_500);
        assert!(log.get(date(2025, 12, 28)).is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prediction_log.json");

        let mut log = PredictionLog::empty(&path);
        log.record(PredictionRecord {
            target_date: date(2025, 12, 26),
            predicted_price: 127_500,
        });
        log.save().unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["2025-12-26"], 127_500);

        let reloaded = PredictionLog::load(&path).unwrap();
        assert_eq!(reloaded.records().collect::<Vec<_>>(), log.records().collect::<Vec<_>>());
    }

    #[test]
    fn test_corrupt_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prediction_log.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(PredictionLog::load(&path), Err(ForecastError::Json(_))));
    }
}
