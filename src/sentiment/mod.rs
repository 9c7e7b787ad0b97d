//! Headline sentiment: RSS feeds → VADER polarity → bounded mood score.

pub mod feed;
pub mod lexicon;
pub mod types;

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Datelike, Utc};
use tracing::{info, warn};

use crate::config::{AppConfig, SentimentConfig};
use crate::constants::{events, sentiment::{SAFE_HAVEN_TAG, SEASONAL_TAG}};
use crate::data::atomic::write_json_atomic;
use crate::error::PipelineError;
use crate::http::build_client;

pub use feed::{HeadlineSource, RssFeed};
pub use lexicon::{PolarityScorer, VaderScorer};
pub use types::{Headline, MoodLabel, RawHeadline, SentimentSnapshot};

pub struct SentimentScorer {
    config: SentimentConfig,
    sources: Vec<Box<dyn HeadlineSource>>,
    polarity: Box<dyn PolarityScorer>,
    snapshot_path: PathBuf,
}

impl SentimentScorer {
    pub fn new(config: &AppConfig) -> Result<Self, PipelineError> {
        let client = build_client(config.sentiment.timeout())?;
        let sources = config
            .sentiment
            .feed_urls
            .iter()
            .map(|url| {
                Box::new(RssFeed::new(client.clone(), url, config.sentiment.max_items_per_feed))
                    as Box<dyn HeadlineSource>
            })
            .collect();

        Ok(Self::with_parts(
            config.sentiment.clone(),
            sources,
            Box::new(VaderScorer::new()),
            config.storage.mood_path(),
        ))
    }

    pub fn with_parts(
        config: SentimentConfig,
        sources: Vec<Box<dyn HeadlineSource>>,
        polarity: Box<dyn PolarityScorer>,
        snapshot_path: PathBuf,
    ) -> Self {
        Self {
            config,
            sources,
            polarity,
            snapshot_path,
        }
    }

    /// Scores current headlines and replaces the persisted snapshot. Never
    /// fails: no headlines at all yields a neutral, empty snapshot.
    pub async fn score(&self) -> SentimentSnapshot {
        self.score_at(Utc::now()).await
    }

    pub async fn score_at(&self, now: DateTime<Utc>) -> SentimentSnapshot {
        let mut raw = Vec::new();
        for source in &self.sources {
            match source.fetch().await {
                Ok(items) => raw.extend(items),
                Err(e) => warn!(
                    event = events::FEED_FAILED,
                    feed = source.name(),
                    "⚠️ [SENTIMENT] Feed failed: {}",
                    e
                ),
            }
        }

        let snapshot = if raw.is_empty() {
            warn!("⚠️ [SENTIMENT] No headlines available - publishing neutral mood");
            SentimentSnapshot::neutral(now)
        } else {
            self.score_headlines(raw, now)
        };

        info!(
            event = events::MOOD_SCORED,
            score = snapshot.mood_score,
            label = %snapshot.mood_label,
            headlines = snapshot.headlines.len(),
            "📊 [SENTIMENT] Mood {:.2} ({})",
            snapshot.mood_score,
            snapshot.mood_label
        );

        if let Err(e) = write_json_atomic(&self.snapshot_path, &snapshot) {
            warn!("⚠️ [SENTIMENT] Failed to persist snapshot: {}", e);
        }

        snapshot
    }

    /// Filters, scores and aggregates headlines. Pure apart from the lexicon.
    pub fn score_headlines(&self, raw: Vec<RawHeadline>, now: DateTime<Utc>) -> SentimentSnapshot {
        let mut seen = HashSet::new();
        let mut keywords = BTreeSet::new();
        let mut headlines = Vec::new();

        for item in raw {
            let lowered = item.title.to_lowercase();
            if item.title.chars().count() <= self.config.min_title_len
                || self.config.meta_keywords.iter().any(|k| lowered.contains(k.as_str()))
                || !seen.insert(lowered.clone())
            {
                continue;
            }

            let mut score = self.polarity.polarity(&item.title);
            if score < 0.0 {
                if let Some(keyword) = self.conflict_keyword(&lowered) {
                    score = -score;
                    keywords.insert(SAFE_HAVEN_TAG.to_string());
                    keywords.insert(keyword.to_string());
                }
            }

            headlines.push(Headline {
                title: item.title,
                source: item.source,
                score,
            });
        }

        let mut mood = if headlines.is_empty() {
            0.0
        } else {
            headlines.iter().map(|h| h.score).sum::<f64>() / headlines.len() as f64
        };

        if self.config.seasonal_months.contains(&now.month()) {
            mood += self.config.seasonal_offset;
            keywords.insert(SEASONAL_TAG.to_string());
        }

        let mood_score = mood.clamp(-1.0, 1.0);
        SentimentSnapshot {
            timestamp: now,
            mood_score,
            mood_label: MoodLabel::from_score(
                mood_score,
                self.config.risk_on_threshold,
                self.config.risk_off_threshold,
            ),
            headlines,
            keywords,
        }
    }

    /// First configured conflict keyword present as a whole word.
    fn conflict_keyword(&self, lowered_title: &str) -> Option<&str> {
        let words: HashSet<&str> = lowered_title
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        self.config
            .conflict_keywords
            .iter()
            .map(String::as_str)
            .find(|k| words.contains(k))
    }
}
