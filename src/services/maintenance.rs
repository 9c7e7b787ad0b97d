//! Offline repair of the data directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::data::ledger::{Ledger, RepairReport};
use crate::error::PipelineError;
use crate::forecast::ForecastOutput;
use crate::sentiment::SentimentSnapshot;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MaintenanceReport {
    pub ledger: RepairReport,
    /// Derived documents that failed to parse and were removed
    pub removed: Vec<PathBuf>,
}

/// Rewrites the ledger from its well-formed rows and removes unreadable
/// dashboard/mood documents; both are regenerated by the next run. The
/// prediction log is never touched.
pub fn repair(storage: &StorageConfig) -> Result<MaintenanceReport, PipelineError> {
    let ledger = Ledger::new(storage.ledger_path());
    let mut report = MaintenanceReport {
        ledger: ledger.repair()?,
        removed: Vec::new(),
    };

    let dashboard = storage.dashboard_path();
    if remove_if_unparsable(&dashboard, |b| serde_json::from_slice::<ForecastOutput>(b).is_ok())? {
        report.removed.push(dashboard);
    }

    let mood = storage.mood_path();
    if remove_if_unparsable(&mood, |b| serde_json::from_slice::<SentimentSnapshot>(b).is_ok())? {
        report.removed.push(mood);
    }

    info!(
        "🧹 [MAINTENANCE] Ledger kept {} rows, {} derived documents removed",
        report.ledger.kept,
        report.removed.len()
    );
    Ok(report)
}

fn remove_if_unparsable(path: &Path, parses: impl Fn(&[u8]) -> bool) -> io::Result<bool> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if parses(&bytes) {
        return Ok(false);
    }
    warn!("[MAINTENANCE] Removing unreadable {}", path.display());
    fs::remove_file(path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_removes_corrupt_documents_and_keeps_log() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..StorageConfig::default()
        };
        fs::write(
            storage.ledger_path(),
            "Date,Gold_Price_22k,USD_INR\n2025-12-24,126500,\n<<<<<<< HEAD\n",
        )
        .unwrap();
        fs::write(storage.dashboard_path(), "{\"current_price\": 12").unwrap();
        fs::write(storage.mood_path(), "not json").unwrap();
        fs::write(storage.prediction_log_path(), "{ corrupt").unwrap();

        let report = repair(&storage).unwrap();

        assert_eq!(report.ledger.kept, 1);
        assert_eq!(report.ledger.dropped_lines, 1);
        assert_eq!(report.removed.len(), 2);
        assert!(!storage.dashboard_path().exists());
        assert!(!storage.mood_path().exists());
        assert!(storage.prediction_log_path().exists());
    }

    #[test]
    fn test_repair_on_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..StorageConfig::default()
        };
        assert_eq!(repair(&storage).unwrap(), MaintenanceReport::default());
    }
}
