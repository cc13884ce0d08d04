//! Context window assembly.
//!
//! Passages enter the window greedily in relevance order until the
//! character budget is spent. News and sentiment enter only when the
//! request asked for them; the window remembers which sections it holds
//! so the decision can be checked downstream.

use crate::query::Query;
use govbrief_core::config::ContextSettings;
use govbrief_evidence::{Article, Passage, SentimentSummary};
use govbrief_prompt::{PromptArticle, PromptDocument, PromptInputs};
use std::cmp::Ordering;
use unicode_segmentation::UnicodeSegmentation;

/// Enrichment gathered for a request, before flag gating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub news: Vec<Article>,
    pub sentiment: Option<SentimentSummary>,
}

/// A passage admitted to the window with the excerpt sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub passage: Passage,
    pub excerpt: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextWindow {
    entries: Vec<ContextEntry>,
    news: Vec<PromptArticle>,
    sentiment: Option<String>,
    dropped: usize,
}

impl ContextWindow {
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    /// Admitted passages, highest relevance first.
    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.entries.iter().map(|e| &e.passage)
    }

    pub fn contains_passage(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.passage.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Passages retrieved but left out for budget.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn news(&self) -> &[PromptArticle] {
        &self.news
    }

    pub fn sentiment(&self) -> Option<&str> {
        self.sentiment.as_deref()
    }

    pub fn has_news(&self) -> bool {
        !self.news.is_empty()
    }

    pub fn has_sentiment(&self) -> bool {
        self.sentiment.is_some()
    }

    /// Template inputs for the generation prompt.
    pub fn to_prompt_inputs(&self, question: &str) -> PromptInputs {
        PromptInputs {
            question: question.to_string(),
            documents: self
                .entries
                .iter()
                .map(|e| PromptDocument {
                    source: e.passage.source.clone(),
                    text: e.excerpt.clone(),
                })
                .collect(),
            news: self.news.clone(),
            sentiment: self.sentiment.clone(),
        }
    }
}

/// Cut `text` to at most `max` grapheme clusters, marking the cut.
pub fn excerpt(text: &str, max: usize) -> String {
    let text = text.trim();
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

fn char_len(text: &str) -> usize {
    text.graphemes(true).count()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler {
    settings: ContextSettings,
}

impl ContextAssembler {
    pub fn new(settings: ContextSettings) -> Self {
        Self { settings }
    }

    pub fn assemble(
        &self,
        passages: &[Passage],
        enrichment: Option<&Enrichment>,
        query: &Query,
    ) -> ContextWindow {
        let mut ordered: Vec<&Passage> = passages.iter().collect();
        ordered.sort_by(|a, b| {
            b.relevance()
                .partial_cmp(&a.relevance())
                .unwrap_or(Ordering::Equal)
        });

        let mut used = 0;
        let mut entries = Vec::new();
        for passage in &ordered {
            let excerpt = excerpt(&passage.text, self.settings.passage_chars);
            let cost = char_len(&excerpt);
            if used + cost > self.settings.budget_chars {
                break;
            }
            used += cost;
            entries.push(ContextEntry {
                passage: (*passage).clone(),
                excerpt,
            });
        }

        let dropped = ordered.len() - entries.len();
        if dropped > 0 {
            tracing::debug!(
                kept = entries.len(),
                dropped,
                budget = self.settings.budget_chars,
                "Context budget exhausted"
            );
        }

        let news = match enrichment {
            Some(e) if query.include_news => self.news_section(&e.news),
            _ => Vec::new(),
        };

        let sentiment = match enrichment.and_then(|e| e.sentiment.as_ref()) {
            Some(s) if query.include_sentiment => {
                Some(excerpt(&s.summary, self.settings.enrichment_chars))
            }
            _ => None,
        };

        ContextWindow {
            entries,
            news,
            sentiment,
            dropped,
        }
    }

    /// Headline-only articles are rendered with their domain.
    fn news_section(&self, articles: &[Article]) -> Vec<PromptArticle> {
        let mut used = 0;
        let mut section = Vec::new();
        for article in articles {
            let text = if article.text.trim().is_empty() {
                article.domain.clone()
            } else {
                excerpt(&article.text, self.settings.passage_chars)
            };
            let cost = char_len(&article.title) + char_len(&text);
            if used + cost > self.settings.enrichment_chars {
                break;
            }
            used += cost;
            section.push(PromptArticle {
                title: article.title.clone(),
                text,
            });
        }
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passages() -> Vec<Passage> {
        vec![
            Passage::new("p1", "Clinics in Turkana lack staff.", "Health Review 2024", 0.9),
            Passage::new("p2", "Budget absorption was 61 percent.", "Controller of Budget", 0.7),
            Passage::new("p3", "Maternal outcomes improved in 2023.", "KDHS", 0.4),
        ]
    }

    fn enrichment() -> Enrichment {
        Enrichment {
            news: vec![
                Article::new("Kenya expands UHC pilot", "nation.africa"),
                Article::new("Nurses strike in Kisumu", "the-star.co.ke")
                    .with_text("Nurses downed tools over delayed pay."),
            ],
            sentiment: Some(SentimentSummary {
                positive: 1,
                negative: 1,
                neutral: 0,
                mean_polarity: 0.0,
                overall: "balanced".to_string(),
                summary: "Public sentiment is balanced.".to_string(),
            }),
        }
    }

    #[test]
    fn test_excerpt_is_grapheme_safe() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
        // "é" written as e + combining acute stays whole
        assert_eq!(excerpt("cafe\u{301} au lait", 4), "cafe\u{301}...");
    }

    #[test]
    fn test_budget_drops_lowest_relevance_first() {
        let assembler = ContextAssembler::new(ContextSettings {
            budget_chars: 70,
            passage_chars: 500,
            enrichment_chars: 1500,
        });
        let window = assembler.assemble(&passages(), None, &Query::new("q"));

        let ids: Vec<&str> = window.passages().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(window.dropped(), 1);
    }

    #[test]
    fn test_orders_by_relevance() {
        let mut shuffled = passages();
        shuffled.reverse();
        let window = ContextAssembler::default().assemble(&shuffled, None, &Query::new("q"));
        let ids: Vec<&str> = window.passages().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_news_only_when_requested() {
        let assembler = ContextAssembler::default();
        let enrichment = enrichment();

        let without = assembler.assemble(&passages(), Some(&enrichment), &Query::new("q"));
        assert!(!without.has_news());
        assert!(!without.has_sentiment());
        let inputs = without.to_prompt_inputs("q");
        assert!(inputs.news.is_empty());
        assert!(inputs.sentiment.is_none());

        let with = assembler.assemble(
            &passages(),
            Some(&enrichment),
            &Query::new("q").with_news(true),
        );
        assert!(with.has_news());
        assert!(!with.has_sentiment());
        assert_eq!(with.news()[0].text, "nation.africa");
        assert_eq!(with.news()[1].text, "Nurses downed tools over delayed pay.");
    }

    #[test]
    fn test_sentiment_only_when_requested() {
        let window = ContextAssembler::default().assemble(
            &passages(),
            Some(&enrichment()),
            &Query::new("q").with_sentiment(true),
        );
        assert!(!window.has_news());
        assert_eq!(window.sentiment(), Some("Public sentiment is balanced."));
    }

    #[test]
    fn test_enrichment_budget() {
        let assembler = ContextAssembler::new(ContextSettings {
            enrichment_chars: 40,
            ..ContextSettings::default()
        });
        let window = assembler.assemble(&[], Some(&enrichment()), &Query::new("q").with_news(true));
        assert_eq!(window.news().len(), 1);
    }

    #[test]
    fn test_prompt_inputs_use_excerpts() {
        let assembler = ContextAssembler::new(ContextSettings {
            passage_chars: 7,
            ..ContextSettings::default()
        });
        let window = assembler.assemble(&passages(), None, &Query::new("q"));
        let inputs = window.to_prompt_inputs("Should we hire nurses?");
        assert_eq!(inputs.question, "Should we hire nurses?");
        assert_eq!(inputs.documents[0].source, "Health Review 2024");
        assert_eq!(inputs.documents[0].text, "Clinics...");
    }

    #[test]
    fn test_deterministic() {
        let assembler = ContextAssembler::default();
        let query = Query::new("q").with_news(true).with_sentiment(true);
        let a = assembler.assemble(&passages(), Some(&enrichment()), &query);
        let b = assembler.assemble(&passages(), Some(&enrichment()), &query);
        assert_eq!(a, b);
    }
}
