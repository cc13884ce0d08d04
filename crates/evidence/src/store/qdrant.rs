//! Qdrant document store over the REST API.

use super::DocumentStore;
use crate::embeddings::EmbeddingProvider;
use crate::types::Passage;
use govbrief_core::{AppError, AppResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Value,
}

impl ScoredPoint {
    fn into_passage(self) -> Option<Passage> {
        let text = self.payload["text"].as_str()?.to_string();
        let source = self.payload["filename"]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown source")
            .to_string();

        let id = match (
            self.payload["document_id"].as_str(),
            self.payload.get("chunk_id").filter(|v| !v.is_null()),
        ) {
            (Some(doc), Some(chunk)) => format!("{}:{}", doc, value_to_string(chunk)),
            _ => value_to_string(&self.id),
        };

        let passage = Passage::new(id, text, source, self.score);
        Some(match self.payload["url"].as_str() {
            Some(url) if !url.is_empty() => passage.with_url(url),
            _ => passage,
        })
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_search_response(body: SearchResponse) -> Vec<Passage> {
    let total = body.result.len();
    let passages: Vec<Passage> = body
        .result
        .into_iter()
        .filter_map(ScoredPoint::into_passage)
        .collect();
    if passages.len() < total {
        tracing::warn!(
            "Dropped {} Qdrant points without a text payload",
            total - passages.len()
        );
    }
    passages
}

pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl QdrantStore {
    pub fn new(url: &str, collection: &str, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        if collection.trim().is_empty() {
            return Err(AppError::Config(
                "Qdrant store requires a collection name".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            api_key: None,
            embedder,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

#[async_trait::async_trait]
impl DocumentStore for QdrantStore {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn query_similar(&self, text: &str, k: usize) -> AppResult<Vec<Passage>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(text).await?;
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );

        let mut request = self.client.post(&url).json(&json!({
            "vector": vector,
            "limit": k,
            "with_payload": true,
        }));
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to query Qdrant: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Retrieval(format!(
                "Qdrant search error ({}): {}",
                status, error_text
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse Qdrant response: {}", e)))?;

        let passages = parse_search_response(body);
        tracing::debug!(
            "Qdrant collection '{}' returned {} passages",
            self.collection,
            passages.len()
        );
        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::TrigramProvider;

    #[test]
    fn test_parse_search_response() {
        let body: SearchResponse = serde_json::from_value(json!({
            "result": [
                {
                    "id": "4f1c",
                    "score": 0.83,
                    "payload": {
                        "text": "Irrigation scheme budget",
                        "filename": "Agriculture 2025.pdf",
                        "document_id": "doc-7",
                        "chunk_id": 3
                    }
                },
                {
                    "id": 42,
                    "score": 1.4,
                    "payload": {"text": "Untitled chunk", "url": "https://example.go.ke/a"}
                },
                {"id": 43, "score": 0.5, "payload": {"filename": "NoText.pdf"}}
            ],
            "status": "ok"
        }))
        .unwrap();

        let passages = parse_search_response(body);
        assert_eq!(passages.len(), 2);

        assert_eq!(passages[0].id, "doc-7:3");
        assert_eq!(passages[0].source, "Agriculture 2025.pdf");
        assert!((passages[0].relevance() - 0.83).abs() < 1e-6);

        assert_eq!(passages[1].id, "42");
        assert_eq!(passages[1].source, "Unknown source");
        assert_eq!(passages[1].relevance(), 1.0);
        assert_eq!(passages[1].url.as_deref(), Some("https://example.go.ke/a"));
    }

    #[test]
    fn test_requires_collection() {
        let embedder = Arc::new(TrigramProvider::new(8));
        assert!(QdrantStore::new("http://localhost:6333", " ", embedder.clone()).is_err());

        let store = QdrantStore::new("http://localhost:6333/", "govdocs", embedder).unwrap();
        assert_eq!(store.base_url, "http://localhost:6333");
    }
}
