//! In-memory document store.
//!
//! Passages are read from a JSONL file (one object per line with `text`,
//! `source` or `filename`, and optional `id` and `url`), embedded once at
//! load time and answered by exhaustive cosine similarity.

use super::{content_id, cosine_similarity, DocumentStore};
use crate::embeddings::EmbeddingProvider;
use crate::types::Passage;
use govbrief_core::{AppError, AppResult};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct PassageRecord {
    #[serde(default)]
    id: Option<String>,
    text: String,
    #[serde(alias = "filename")]
    source: String,
    #[serde(default)]
    url: Option<String>,
}

impl PassageRecord {
    fn into_passage(self) -> Passage {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| content_id(&self.source, &self.text));
        let passage = Passage::new(id, self.text, self.source, 0.0);
        match self.url {
            Some(url) => passage.with_url(url),
            None => passage,
        }
    }
}

pub struct MemoryStore {
    entries: Vec<(Passage, Vec<f32>)>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MemoryStore {
    /// Embed the given passages.
    pub async fn from_passages(
        passages: Vec<Passage>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;

        if vectors.len() != passages.len() {
            return Err(AppError::Retrieval(format!(
                "Embedder returned {} vectors for {} passages",
                vectors.len(),
                passages.len()
            )));
        }

        tracing::info!(
            "Memory store ready: {} passages embedded with {} ({})",
            passages.len(),
            embedder.provider_name(),
            embedder.model_name()
        );

        Ok(Self {
            entries: passages.into_iter().zip(vectors).collect(),
            embedder,
        })
    }

    /// Load and embed a JSONL passage file. A missing file yields an empty
    /// store.
    pub async fn from_jsonl(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        if !path.exists() {
            tracing::warn!("Passage file {:?} not found; starting with an empty store", path);
            return Self::from_passages(Vec::new(), embedder).await;
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut passages = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            let record: PassageRecord = serde_json::from_str(&line).map_err(|e| {
                AppError::Retrieval(format!(
                    "Failed to parse line {} in {:?}: {}",
                    line_num + 1,
                    path,
                    e
                ))
            })?;
            passages.push(record.into_passage());
        }

        tracing::debug!("Read {} passages from {:?}", passages.len(), path);
        Self::from_passages(passages, embedder).await
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn query_similar(&self, text: &str, k: usize) -> AppResult<Vec<Passage>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(text).await?;

        let mut results: Vec<Passage> = self
            .entries
            .iter()
            .map(|(passage, vector)| passage.clone().rescored(cosine_similarity(&query, vector)))
            .collect();

        // Stable: equal scores keep file order
        results.sort_by(|a, b| {
            b.relevance()
                .partial_cmp(&a.relevance())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        tracing::debug!(
            "Memory store returned {} passages (requested top-{})",
            results.len(),
            k
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::TrigramProvider;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(TrigramProvider::new(256))
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let passages = vec![
            Passage::new("p1", "Road construction tenders in Kisumu", "Roads.pdf", 0.0),
            Passage::new("p2", "Healthcare funding for county hospitals", "Health.pdf", 0.0),
            Passage::new("p3", "Healthcare workers and hospitals staffing", "Staff.pdf", 0.0),
        ];
        let store = MemoryStore::from_passages(passages, embedder()).await.unwrap();

        let results = store.query_similar("county healthcare hospitals funding", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "p2");
        assert!(results[0].relevance() >= results[1].relevance());
        assert!(results.iter().all(|p| (0.0..=1.0).contains(&p.relevance())));
    }

    #[tokio::test]
    async fn test_ties_keep_store_order() {
        let passages = vec![
            Passage::new("first", "unrelated alpha", "A.pdf", 0.0),
            Passage::new("second", "unrelated beta", "B.pdf", 0.0),
        ];
        let store = MemoryStore::from_passages(passages, embedder()).await.unwrap();

        // A stop-word query embeds to the zero vector, so both score zero
        let results = store.query_similar("the", 5).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_from_jsonl_assigns_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"text":"Bursary disbursement","filename":"Edu.pdf"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"id":"x1","text":"Bursary audit","source":"Audit.pdf","url":"https://example.go.ke/audit"}}"#
        )
        .unwrap();

        let store = MemoryStore::from_jsonl(file.path(), embedder()).await.unwrap();
        assert_eq!(store.len(), 2);

        let results = store.query_similar("bursary", 5).await.unwrap();
        let generated = results.iter().find(|p| p.source == "Edu.pdf").unwrap();
        assert_eq!(generated.id, content_id("Edu.pdf", "Bursary disbursement"));
        let explicit = results.iter().find(|p| p.id == "x1").unwrap();
        assert_eq!(explicit.url.as_deref(), Some("https://example.go.ke/audit"));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let store = MemoryStore::from_jsonl(Path::new("/nonexistent/passages.jsonl"), embedder())
            .await
            .unwrap();
        assert!(store.is_empty());
        assert!(store.query_similar("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_line_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        let err = MemoryStore::from_jsonl(file.path(), embedder()).await.err().unwrap();
        assert!(err.to_string().contains("line 1"));
    }
}
