use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::StorageConfig;
use crate::constants;
use crate::data::atomic::write_json_atomic;
use crate::forecast::ForecastOutput;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub ts: String,
    pub run_id: String,

    /// "recorded" | "skipped" | "extraction_failed" | "ledger_failed"
    pub outcome: String,

    pub date: Option<NaiveDate>,
    pub price: Option<u64>,
    pub forecast: Option<u64>,

    /// Failure reason or degradation note (best-effort)
    pub notes: Option<String>,
}

impl RunLogEntry {
    pub fn new(run_id: &str, outcome: &str) -> Self {
        Self {
            ts: Utc::now().to_rfc3339(),
            run_id: run_id.to_string(),
            outcome: outcome.to_string(),
            date: None,
            price: None,
            forecast: None,
            notes: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_runs: u64,
    pub recorded: u64,
    pub skipped: u64,
    pub extraction_failed: u64,
    pub ledger_failed: u64,
    pub forecasts: u64,
    pub last_run: Option<RunLogEntry>,
}

/// Appends one JSON line per run and keeps a rolling summary next to it.
#[derive(Clone)]
pub struct RunReporter {
    summary: Arc<Mutex<RunSummary>>,
    log_path: PathBuf,
    dashboard_path: PathBuf,
}

impl RunReporter {
    /// Counters resume from an existing `run_summary.json`; a missing or
    /// unreadable one starts from zero.
    pub fn new(storage: &StorageConfig) -> Self {
        let log_path = storage.run_log_path();
        let summary = load_summary(&summary_path_for(&log_path));
        Self {
            summary: Arc::new(Mutex::new(summary)),
            log_path,
            dashboard_path: storage.dashboard_path(),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn summary(&self) -> RunSummary {
        self.lock().clone()
    }

    /// Best-effort: a failed write is logged and never fails the run.
    pub fn record(&self, entry: RunLogEntry) {
        {
            let mut s = self.lock();
            s.total_runs += 1;
            match entry.outcome.as_str() {
                "recorded" => s.recorded += 1,
                "skipped" => s.skipped += 1,
                "extraction_failed" => s.extraction_failed += 1,
                "ledger_failed" => s.ledger_failed += 1,
                _ => {}
            }
            if entry.forecast.is_some() {
                s.forecasts += 1;
            }
            s.last_run = Some(entry.clone());
        }

        if let Err(e) = self.append_jsonl(&entry) {
            error!("[REPORT] Failed to append run log: {}", e);
        }
        if let Err(e) = self.flush_summary() {
            error!("[REPORT] Failed to flush run summary: {}", e);
        }
    }

    /// Replaces the dashboard document atomically.
    pub fn publish_dashboard(&self, output: &ForecastOutput) -> std::io::Result<()> {
        write_json_atomic(&self.dashboard_path, output)?;
        info!("🖥️ [REPORT] Dashboard updated: {}", self.dashboard_path.display());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, RunSummary> {
        self.summary.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn append_jsonl(&self, entry: &RunLogEntry) -> std::io::Result<()> {
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        let line = serde_json::to_string(entry)?;
        writeln!(f, "{}", line)?;
        f.sync_data()
    }

    fn flush_summary(&self) -> std::io::Result<()> {
        let s = self.summary();
        write_json_atomic(&summary_path_for(&self.log_path), &s)
    }
}

fn summary_path_for(log_path: &Path) -> PathBuf {
    log_path.with_file_name(constants::storage::RUN_SUMMARY_FILE)
}

fn load_summary(path: &Path) -> RunSummary {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RunSummary::default(),
        Err(e) => {
            warn!("⚠️ [REPORT] Cannot read {}: {}; counters start at zero", path.display(), e);
            return RunSummary::default();
        }
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!("⚠️ [REPORT] Ignoring unparsable {}: {}", path.display(), e);
        RunSummary::default()
    })
}
