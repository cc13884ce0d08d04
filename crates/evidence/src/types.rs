//! Evidence entities shared by stores, enrichment and the engine.

use serde::{Deserialize, Deserializer, Serialize};

/// Clamp a similarity score into `[0, 1]`; non-finite scores become 0.
pub fn clamp_relevance(score: f32) -> f32 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn deserialize_relevance<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f32>::deserialize(deserializer)?;
    Ok(raw.map(clamp_relevance).unwrap_or(0.0))
}

/// A retrieved evidence excerpt.
///
/// Relevance is held in `[0, 1]` regardless of how the passage was built
/// or decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    /// Document title or file name
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_relevance")]
    relevance: f32,
}

impl Passage {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        source: impl Into<String>,
        relevance: f32,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: source.into(),
            url: None,
            relevance: clamp_relevance(relevance),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn relevance(&self) -> f32 {
        self.relevance
    }

    /// Same passage with a new score.
    pub fn rescored(mut self, relevance: f32) -> Self {
        self.relevance = clamp_relevance(relevance);
        self
    }
}

/// Outcome of one retrieval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieval {
    /// Ordered by non-increasing relevance
    pub passages: Vec<Passage>,
    /// The store failed or timed out on every attempt
    pub degraded: bool,
}

impl Retrieval {
    pub fn degraded() -> Self {
        Self {
            passages: Vec::new(),
            degraded: true,
        }
    }
}

/// A news article from an enrichment source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// Body or summary; empty for headline-only sources
    #[serde(default)]
    pub text: String,
}

impl Article {
    pub fn new(title: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: String::new(),
            domain: domain.into(),
            published_at: None,
            text: String::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Label a polarity in `[-1, 1]` with a ±0.1 neutral band.
    pub fn from_polarity(polarity: f32) -> Self {
        if polarity > 0.1 {
            SentimentLabel::Positive
        } else if polarity < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// Aggregate public sentiment over a set of articles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub mean_polarity: f32,
    /// "optimistic", "concerned", "balanced" or "unknown"
    pub overall: String,
    /// One-line description rendered into the context
    pub summary: String,
}

impl SentimentSummary {
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}
