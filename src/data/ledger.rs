use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::events;
use crate::data::atomic::{write_atomic, StagedWrite};
use crate::data::types::Observation;
use crate::error::LedgerError;

/// Current on-disk header (schema v2).
pub const LEDGER_HEADER: [&str; 3] = ["Date", "Gold_Price_22k", "USD_INR"];

/// Header written before the exchange-rate column existed.
pub const LEDGER_HEADER_V1: [&str; 2] = ["Date", "Gold_Price_22k"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerSchema {
    V1,
    V2,
}

impl LedgerSchema {
    fn detect(header: &csv::StringRecord) -> Option<Self> {
        let cols: Vec<&str> = header.iter().collect();
        if cols == LEDGER_HEADER {
            Some(LedgerSchema::V2)
        } else if cols == LEDGER_HEADER_V1 {
            Some(LedgerSchema::V1)
        } else {
            None
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Gold_Price_22k")]
    price: u64,
    #[serde(rename = "USD_INR", default)]
    fx_rate: Option<f64>,
}

impl From<&Observation> for LedgerRow {
    fn from(o: &Observation) -> Self {
        Self {
            date: o.date,
            price: o.price,
            fx_rate: o.fx_rate,
        }
    }
}

/// Outcome of [`Ledger::repair`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub kept: usize,
    pub dropped_lines: usize,
    pub duplicates: usize,
}

/// Append-only, date-keyed price ledger backed by a CSV file.
#[derive(Clone, Debug)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All observations in ascending date order; empty if the file does not exist.
    pub fn read_all(&self) -> Result<Vec<Observation>, LedgerError> {
        match fs::read(&self.path) {
            Ok(bytes) => Self::parse(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `Ok(false)` without writing when the date is already recorded.
    pub fn append_if_new(&self, observation: &Observation) -> Result<bool, LedgerError> {
        match self.prepare_append(observation)? {
            Some(staged) => {
                staged.commit()?;
                info!(
                    event = events::OBSERVATION_RECORDED,
                    date = %observation.date,
                    price = observation.price,
                    "📒 [LEDGER] Recorded {} = ₹{}",
                    observation.date,
                    observation.price
                );
                Ok(true)
            }
            None => {
                info!(
                    event = events::IDEMPOTENT_SKIP,
                    date = %observation.date,
                    "⏭️ [LEDGER] {} already recorded - skipping write",
                    observation.date
                );
                Ok(false)
            }
        }
    }

    /// Renders and stages the post-append table without touching the canonical file.
    ///
    /// `None` means the date is already present. The caller commits the staged
    /// write; dropping it abandons the append.
    pub fn prepare_append(&self, observation: &Observation) -> Result<Option<StagedWrite>, LedgerError> {
        if observation.price == 0 {
            return Err(LedgerError::InvalidPrice {
                date: observation.date,
                price: observation.price,
            });
        }

        let mut rows = self.read_all()?;
        let idx = match rows.binary_search_by_key(&observation.date, |o| o.date) {
            Ok(_) => return Ok(None),
            Err(idx) => idx,
        };

        if idx < rows.len() {
            warn!(
                "[LEDGER] Back-dated observation {} inserted before {}",
                observation.date, rows[idx].date
            );
        }

        let mut row = observation.clone();
        row.observed_at = None;
        rows.insert(idx, row);

        let bytes = Self::render(&rows)?;
        Ok(Some(StagedWrite::stage(&self.path, &bytes)?))
    }

    pub fn parse(bytes: &[u8]) -> Result<Vec<Observation>, LedgerError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let header = reader.headers()?.clone();
        if header.is_empty() {
            return Ok(Vec::new());
        }
        if LedgerSchema::detect(&header).is_none() {
            return Err(LedgerError::Schema {
                found: header.iter().map(String::from).collect(),
            });
        }

        let mut out: Vec<Observation> = Vec::new();
        for (i, record) in reader.deserialize::<LedgerRow>().enumerate() {
            let row = record?;
            if let Some(prev) = out.last() {
                if row.date <= prev.date {
                    return Err(LedgerError::OutOfOrder {
                        row: i + 2,
                        date: row.date,
                        previous: prev.date,
                    });
                }
            }
            out.push(Observation::new(row.date, row.price).with_fx(row.fx_rate));
        }
        Ok(out)
    }

    pub fn render(rows: &[Observation]) -> Result<Vec<u8>, LedgerError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        writer.write_record(LEDGER_HEADER)?;
        for o in rows {
            writer.serialize(LedgerRow::from(o))?;
        }
        writer.into_inner().map_err(|e| LedgerError::Io(e.into_error()))
    }

    /// Rewrites the ledger keeping only well-formed rows, de-duplicated by date
    /// (last occurrence wins) and sorted. Lines such as merge-conflict markers
    /// are dropped.
    pub fn repair(&self) -> Result<RepairReport, LedgerError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RepairReport::default()),
            Err(e) => return Err(e.into()),
        };

        let (rows, mut report) = salvage_rows(&text);
        report.kept = rows.len();

        let bytes = Self::render(&rows)?;
        write_atomic(&self.path, &bytes)?;

        info!(
            "🧹 [LEDGER] Repaired {}: kept {}, dropped {} lines, merged {} duplicates",
            self.path.display(),
            report.kept,
            report.dropped_lines,
            report.duplicates
        );
        Ok(report)
    }
}

static ROW_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2}),(\d+)(?:,(\d+(?:\.\d+)?)?)?$").unwrap());

fn salvage_rows(text: &str) -> (Vec<Observation>, RepairReport) {
    let mut report = RepairReport::default();
    let mut by_date: BTreeMap<NaiveDate, Observation> = BTreeMap::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("Date,") {
            continue;
        }

        let parsed = ROW_PATTERN.captures(line).and_then(|caps| {
            let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
            let price: u64 = caps[2].parse().ok().filter(|p| *p > 0)?;
            let fx = caps.get(3).and_then(|m| m.as_str().parse::<f64>().ok());
            Some(Observation::new(date, price).with_fx(fx))
        });

        match parsed {
            Some(obs) => {
                if by_date.insert(obs.date, obs).is_some() {
                    report.duplicates += 1;
                }
            }
            None => report.dropped_lines += 1,
        }
    }

    (by_date.into_values().collect(), report)
}
