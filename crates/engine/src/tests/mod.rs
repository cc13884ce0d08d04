//! End-to-end pipeline tests with scripted generation and stub evidence.


use crate::orchestrator::{Orchestrator, PromptSet};
use crate::transport::Frame;
use chrono::{TimeZone, Utc};
use govbrief_core::config::{AppConfig, RetrievalSettings};
use govbrief_core::{AppError, AppResult};
use govbrief_evidence::{Article, DocumentStore, LexiconSentiment, NewsService, Passage, RetrievalAdapter};
use govbrief_llm::LlmClient;
use std::sync::Arc;
use std::time::Duration;

/// Marker carried by every stub news headline.
const NEWS_MARKER: &str = "NEWSWIRE";

/// Returns fixed passages in store order, or always fails.
struct StubStore {
    passages: Vec<Passage>,
    fail: bool,
}

impl StubStore {
    fn with(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            passages: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for StubStore {
    fn name(&self) -> &str {
        "stub"
    }

    async fn query_similar(&self, _text: &str, k: usize) -> AppResult<Vec<Passage>> {
        if self.fail {
            return Err(AppError::Retrieval("vector store unreachable".to_string()));
        }
        Ok(self.passages.iter().take(k).cloned().collect())
    }
}

struct StubNews;

#[async_trait::async_trait]
impl NewsService for StubNews {
    async fn fetch(&self, _topic: &str) -> AppResult<Vec<Article>> {
        Ok(vec![
            Article::new(format!("{} Kenya nurses welcome new hiring plan", NEWS_MARKER), "nation.africa"),
            Article::new(format!("{} Clinics warn of drug shortage", NEWS_MARKER), "the-star.co.ke"),
        ])
    }
}

/// Store order is deliberately not relevance order.
fn passages() -> Vec<Passage> {
    vec![
        Passage::new("p-low", "Ambulance coverage is patchy.", "County Health Audit", 0.35),
        Passage::new(
            "p-high",
            "Turkana has one nurse per 2,000 residents.",
            "Health Review 2024",
            0.92,
        )
        .with_url("https://health.go.ke/review-2024"),
        Passage::new("p-tie-a", "Nurse attrition reached 14 percent.", "HR Census", 0.6),
        Passage::new(
            "p-tie-b",
            "Training colleges graduate 3,000 nurses yearly.",
            "KMTC Report",
            0.6,
        ),
    ]
}

const VALID_REPORT: &str = r#"{
  "decision_required": "Whether to fund 500 additional nurses for ASAL counties",
  "timeline": "Within 4 weeks",
  "accountable": "Ministry of Health",
  "executive_summary": {
    "recommendation": "Fund a phased hire over two years.",
    "rationale": "Staffing gaps are acute in arid counties.",
    "key_risks": ["Budget pressure"],
    "expected_impact": "Shorter wait times in Turkana and Wajir."
  },
  "options": [
    {"name": "Phased hire", "description": "Hire 250 nurses per year.", "benefits": ["Affordable"],
     "risks": ["Slower relief"], "tradeoffs": "Speed against cost", "cost": "KES 1.2B", "impact_score": "High"},
    {"name": "Status quo", "description": "No new hires.", "benefits": ["No cost"],
     "risks": ["Attrition continues"], "tradeoffs": "Savings against outcomes", "cost": "Low cost", "impact_score": "Low"}
  ],
  "recommended_option": "Phased hire",
  "recommendation_rationale": "Balances fiscal space and need.",
  "data_sources": ["Health Review 2024"]
}"#;

fn config() -> AppConfig {
    AppConfig::default()
}

/// Orchestrator over `store` with stub news, lexicon sentiment, a fixed
/// clock and short generation timeouts.
fn orchestrator_with(
    config: &AppConfig,
    llm: Arc<dyn LlmClient>,
    store: StubStore,
) -> Orchestrator {
    let retrieval = RetrievalAdapter::new(Arc::new(store), &RetrievalSettings::default())
        .with_timeout(Duration::from_millis(100));
    let fixed = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();

    Orchestrator::new(config, llm, retrieval, PromptSet::builtin().unwrap())
        .with_news(Arc::new(StubNews))
        .with_sentiment(Arc::new(LexiconSentiment::default()))
        .with_clock(Arc::new(move || fixed))
        .with_timeouts(Duration::from_millis(300), Duration::from_millis(300))
}

fn orchestrator(llm: Arc<dyn LlmClient>) -> Orchestrator {
    orchestrator_with(&config(), llm, StubStore::with(passages()))
}

fn kinds(frames: &[Frame]) -> Vec<&'static str> {
    frames.iter().map(Frame::kind).collect()
}

fn content_text(frames: &[Frame]) -> String {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Content(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
