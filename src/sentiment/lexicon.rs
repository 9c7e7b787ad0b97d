use vader_sentiment::SentimentIntensityAnalyzer;

/// Maps a headline to a polarity in [-1, 1].
pub trait PolarityScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// VADER compound score.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl PolarityScorer for VaderScorer {
    fn polarity(&self, text: &str) -> f64 {
        self.analyzer
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vader_polarity_direction() {
        let scorer = VaderScorer::new();
        assert!(scorer.polarity("Gold prices surge to a great record high") > 0.0);
        assert!(scorer.polarity("Gold prices crash in terrible selloff") < 0.0);
    }
}
