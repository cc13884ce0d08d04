//! News enrichment.
//!
//! `GdeltNews` queries the GDELT DOC 2.0 article list API. Results are
//! headline-only: GDELT returns titles, URLs and domains, no article body.

use crate::types::Article;
use govbrief_core::config::NewsSettings;
use govbrief_core::{AppError, AppResult};
use serde::Deserialize;
use std::time::Duration;

/// Source of recent articles about a topic.
#[async_trait::async_trait]
pub trait NewsService: Send + Sync {
    async fn fetch(&self, topic: &str) -> AppResult<Vec<Article>>;
}

const KEYWORD_STOP_WORDS: &[&str] = &[
    "what", "is", "the", "a", "an", "on", "in", "of", "for", "to", "about", "how", "why", "when",
    "where", "which", "should", "would", "could", "with", "this", "that", "from", "into",
];

/// Pull up to five topic keywords out of a question.
///
/// Words of three characters or fewer and stop words are dropped; order
/// of first appearance is kept and duplicates are removed.
pub fn extract_keywords(question: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for raw in question.split_whitespace() {
        let word = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.chars().count() > 3
            && !KEYWORD_STOP_WORDS.contains(&word.as_str())
            && !keywords.contains(&word)
        {
            keywords.push(word);
        }
        if keywords.len() == 5 {
            break;
        }
    }
    keywords
}

#[derive(Debug, Deserialize)]
struct ArtListResponse {
    #[serde(default)]
    articles: Vec<GdeltArticle>,
}

#[derive(Debug, Deserialize)]
struct GdeltArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    seendate: Option<String>,
}

pub struct GdeltNews {
    client: reqwest::Client,
    endpoint: String,
    region: Option<String>,
    lookback_days: u32,
    max_articles: usize,
}

impl GdeltNews {
    pub fn new(settings: &NewsSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client for GDELT: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            region: settings
                .region
                .as_ref()
                .map(|r| r.trim().to_lowercase())
                .filter(|r| !r.is_empty()),
            lookback_days: settings.lookback_days.max(1),
            max_articles: settings.max_articles,
        })
    }

    /// Region first, then up to three topic keywords.
    fn build_query(&self, topic: &str) -> String {
        let mut parts: Vec<String> = self.region.iter().cloned().collect();
        parts.extend(
            extract_keywords(topic)
                .into_iter()
                .filter(|k| Some(k) != self.region.as_ref())
                .take(3),
        );
        parts.join(" ")
    }

    fn is_relevant(&self, article: &GdeltArticle) -> bool {
        match &self.region {
            None => true,
            Some(region) => {
                let haystack =
                    format!("{} {} {}", article.title, article.url, article.domain).to_lowercase();
                haystack.contains(region.as_str())
            }
        }
    }

    fn standardize(&self, body: ArtListResponse) -> Vec<Article> {
        body.articles
            .into_iter()
            .filter(|a| !a.title.trim().is_empty() && self.is_relevant(a))
            .take(self.max_articles)
            .map(|a| Article {
                title: a.title.trim().to_string(),
                url: a.url,
                domain: a.domain,
                published_at: a.seendate,
                text: String::new(),
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl NewsService for GdeltNews {
    async fn fetch(&self, topic: &str) -> AppResult<Vec<Article>> {
        let query = self.build_query(topic);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!("GDELT search: '{}'", query);

        let max_records = self.max_articles.to_string();
        let timespan = format!("{}d", self.lookback_days);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("query", query.as_str()),
                ("mode", "ArtList"),
                ("maxrecords", max_records.as_str()),
                ("format", "json"),
                ("timespan", timespan.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to query GDELT: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Retrieval(format!(
                "GDELT error ({})",
                response.status()
            )));
        }

        let body: ArtListResponse = response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse GDELT response: {}", e)))?;

        let articles = self.standardize(body);
        tracing::info!("GDELT returned {} relevant articles", articles.len());
        Ok(articles)
    }
}
