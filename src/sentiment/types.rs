use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SentimentError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoodLabel {
    RiskOn,
    RiskOff,
    Neutral,
}

impl MoodLabel {
    pub fn from_score(score: f64, risk_on: f64, risk_off: f64) -> Self {
        if score > risk_on {
            MoodLabel::RiskOn
        } else if score < risk_off {
            MoodLabel::RiskOff
        } else {
            MoodLabel::Neutral
        }
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MoodLabel::RiskOn => "RISK_ON",
            MoodLabel::RiskOff => "RISK_OFF",
            MoodLabel::Neutral => "NEUTRAL",
        };
        f.write_str(s)
    }
}

/// Raw feed item before scoring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawHeadline {
    pub title: String,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
    /// Polarity after overrides, in [-1, 1]
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentSnapshot {
    pub timestamp: DateTime<Utc>,
    pub mood_score: f64,
    pub mood_label: MoodLabel,
    pub headlines: Vec<Headline>,
    pub keywords: BTreeSet<String>,
}

impl SentimentSnapshot {
    pub fn neutral(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            mood_score: 0.0,
            mood_label: MoodLabel::Neutral,
            headlines: Vec::new(),
            keywords: BTreeSet::new(),
        }
    }

    /// Last persisted snapshot, if any.
    pub fn load(path: &Path) -> Result<Option<Self>, SentimentError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
