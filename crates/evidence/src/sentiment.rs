//! Public sentiment over news articles.

use crate::types::{Article, SentimentLabel, SentimentSummary};
use govbrief_core::AppResult;
use std::collections::HashSet;

/// Aggregate sentiment analysis.
#[async_trait::async_trait]
pub trait SentimentService: Send + Sync {
    async fn analyze(&self, articles: &[Article]) -> AppResult<SentimentSummary>;
}

const POSITIVE_WORDS: &[&str] = &[
    "approve", "approved", "benefit", "benefits", "boost", "boosts", "gain", "gains", "good",
    "growth", "improve", "improved", "improvement", "increase", "launch", "launches", "progress",
    "praise", "praised", "record", "relief", "rise", "rises", "success", "successful", "support",
    "supports", "welcome", "welcomed", "win", "wins",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "collapse", "concern", "concerns", "corruption", "crisis", "cut", "cuts", "decline",
    "delay", "delayed", "deficit", "fail", "failed", "failure", "fraud", "loss", "losses",
    "oppose", "opposed", "protest", "protests", "scandal", "shortage", "strike", "strikes",
    "threat", "unrest", "violence", "warn", "warns",
];

/// Word-list polarity scorer.
///
/// Polarity of a text is `(positive - negative) / (positive + negative)`
/// over its lexicon hits, or 0 without hits.
pub struct LexiconSentiment {
    positive: HashSet<String>,
    negative: HashSet<String>,
}

impl Default for LexiconSentiment {
    fn default() -> Self {
        Self::with_lexicon(POSITIVE_WORDS, NEGATIVE_WORDS)
    }
}

impl LexiconSentiment {
    pub fn with_lexicon(positive: &[&str], negative: &[&str]) -> Self {
        Self {
            positive: positive.iter().map(|w| w.to_lowercase()).collect(),
            negative: negative.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn polarity(&self, text: &str) -> f32 {
        let (mut pos, mut neg) = (0u32, 0u32);
        for raw in text.split_whitespace() {
            let word = raw
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if self.positive.contains(&word) {
                pos += 1;
            } else if self.negative.contains(&word) {
                neg += 1;
            }
        }
        if pos + neg == 0 {
            0.0
        } else {
            (pos as f32 - neg as f32) / (pos + neg) as f32
        }
    }

    fn summarize(&self, articles: &[Article]) -> SentimentSummary {
        if articles.is_empty() {
            return SentimentSummary {
                positive: 0,
                negative: 0,
                neutral: 0,
                mean_polarity: 0.0,
                overall: "unknown".to_string(),
                summary: "No recent articles available for sentiment analysis.".to_string(),
            };
        }

        let (mut positive, mut negative, mut neutral) = (0, 0, 0);
        let mut total_polarity = 0.0f32;

        for article in articles {
            let polarity = self.polarity(&format!("{} {}", article.title, article.text));
            total_polarity += polarity;
            match SentimentLabel::from_polarity(polarity) {
                SentimentLabel::Positive => positive += 1,
                SentimentLabel::Negative => negative += 1,
                SentimentLabel::Neutral => neutral += 1,
            }
        }

        let mean_polarity = total_polarity / articles.len() as f32;
        let overall = if positive > negative {
            "optimistic"
        } else if negative > positive {
            "concerned"
        } else {
            "balanced"
        };

        SentimentSummary {
            positive,
            negative,
            neutral,
            mean_polarity,
            overall: overall.to_string(),
            summary: format!(
                "Public sentiment across {} recent articles is {}: {} positive, {} negative, {} neutral (mean polarity {:.2}).",
                articles.len(),
                overall,
                positive,
                negative,
                neutral,
                mean_polarity
            ),
        }
    }
}

#[async_trait::async_trait]
impl SentimentService for LexiconSentiment {
    async fn analyze(&self, articles: &[Article]) -> AppResult<SentimentSummary> {
        let summary = self.summarize(articles);
        tracing::debug!(
            "Sentiment over {} articles: {} ({:.2})",
            summary.total(),
            summary.overall,
            summary.mean_polarity
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity() {
        let lexicon = LexiconSentiment::default();
        assert_eq!(lexicon.polarity("Farmers welcome fertilizer subsidy"), 1.0);
        assert_eq!(lexicon.polarity("Teachers strike over delayed pay"), -1.0);
        assert_eq!(lexicon.polarity("Growth despite strikes"), 0.0);
        assert_eq!(lexicon.polarity("Cabinet meets on Tuesday"), 0.0);
    }

    #[tokio::test]
    async fn test_analyze_counts_and_summary() {
        let lexicon = LexiconSentiment::default();
        let articles = vec![
            Article::new("Farmers welcome fertilizer subsidy", "nation.africa"),
            Article::new("Hospitals report improved outcomes", "the-star.co.ke"),
            Article::new("Teachers strike over delayed pay", "citizen.digital"),
            Article::new("Cabinet meets on Tuesday", "kbc.co.ke"),
        ];

        let summary = lexicon.analyze(&articles).await.unwrap();
        assert_eq!((summary.positive, summary.negative, summary.neutral), (2, 1, 1));
        assert_eq!(summary.overall, "optimistic");
        assert!((summary.mean_polarity - 0.25).abs() < 1e-6);
        assert!(summary.summary.contains("4 recent articles"));
        assert!(summary.summary.contains("mean polarity 0.25"));
    }

    #[tokio::test]
    async fn test_analyze_empty() {
        let summary = LexiconSentiment::default().analyze(&[]).await.unwrap();
        assert_eq!(summary.overall, "unknown");
        assert_eq!(summary.total(), 0);
    }

    #[tokio::test]
    async fn test_article_text_counts() {
        let lexicon = LexiconSentiment::with_lexicon(&["levy"], &[]);
        let article = Article::new("Housing update", "x").with_text("New levy announced");
        let summary = lexicon.analyze(&[article]).await.unwrap();
        assert_eq!(summary.positive, 1);
    }
}
