//! Query intent classification.
//!
//! Phrase lists and the decision threshold come from configuration; the
//! matching rules and the confidence ladder live here. Phrases match on
//! whole words, so "fund" does not fire on "refund" or "fundamental".

use govbrief_core::config::ClassifierSettings;
use govbrief_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Decision,
    Exploratory,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Decision => "decision",
            QueryKind::Exploratory => "exploratory",
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: QueryKind,
    pub confidence: f32,
    pub reasoning: String,
}

/// Lowercase words; hyphens stay inside words, all other punctuation
/// separates them.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|w| w.trim_matches('-'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
struct PhraseList(Vec<Vec<String>>);

impl PhraseList {
    fn new(phrases: &[String]) -> Self {
        Self(
            phrases
                .iter()
                .map(|p| tokenize(p))
                .filter(|p| !p.is_empty())
                .collect(),
        )
    }

    /// Number of phrases occurring as contiguous word runs.
    fn hits(&self, words: &[String]) -> usize {
        self.0
            .iter()
            .filter(|phrase| words.windows(phrase.len()).any(|w| w == phrase.as_slice()))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct QueryClassifier {
    strong: PhraseList,
    moderate: PhraseList,
    exploratory: PhraseList,
    threshold: f32,
}

impl QueryClassifier {
    pub fn new(settings: &ClassifierSettings) -> Self {
        Self {
            strong: PhraseList::new(&settings.strong_decision),
            moderate: PhraseList::new(&settings.moderate_decision),
            exploratory: PhraseList::new(&settings.exploratory),
            threshold: settings.decision_threshold,
        }
    }

    /// Classify a query. Deterministic for identical input.
    ///
    /// # Errors
    /// `AppError::Validation` for empty or whitespace-only input.
    pub fn classify(&self, text: &str) -> AppResult<Classification> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("Query must not be empty".to_string()));
        }

        let words = tokenize(text);
        let has_should = words.iter().any(|w| w == "should");
        let strong = self.strong.hits(&words) + usize::from(has_should);
        let moderate = self.moderate.hits(&words);
        let exploratory = self.exploratory.hits(&words);

        let decision_phrased = if exploratory > 0 {
            // "What should we…" and "How should…" still ask for a decision
            has_should
        } else {
            strong > 0 || (moderate > 0 && text.contains('?'))
        };

        if !decision_phrased {
            return Ok(if exploratory > 0 {
                Classification {
                    kind: QueryKind::Exploratory,
                    confidence: 0.90,
                    reasoning: "Clear exploratory language".to_string(),
                }
            } else {
                Classification {
                    kind: QueryKind::Exploratory,
                    confidence: 0.70,
                    reasoning: "No strong decision indicators".to_string(),
                }
            });
        }

        let (confidence, reasoning) = if strong >= 2 {
            (
                0.95,
                format!("Strong decision language detected: {} indicators", strong),
            )
        } else if strong == 1 {
            (0.85, "Clear decision keyword present".to_string())
        } else if moderate >= 2 {
            (0.70, "Multiple policy/decision context keywords".to_string())
        } else {
            (0.60, "Policy context suggests decision query".to_string())
        };

        if confidence < self.threshold {
            tracing::debug!(
                confidence,
                threshold = self.threshold,
                "Decision signal below threshold; treating as exploratory"
            );
            return Ok(Classification {
                kind: QueryKind::Exploratory,
                confidence: 0.70,
                reasoning: format!(
                    "Weak decision signal ({:.2}) below threshold {:.2}",
                    confidence, self.threshold
                ),
            });
        }

        Ok(Classification {
            kind: QueryKind::Decision,
            confidence,
            reasoning,
        })
    }
}
