//! Document stores answering similarity queries.

pub mod memory;
pub mod qdrant;

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::types::Passage;
use govbrief_core::config::{RetrievalSettings, StoreSettings};
use govbrief_core::AppResult;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// Similarity search over stored passages.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short name for logs ("memory", "qdrant")
    fn name(&self) -> &str;

    /// Up to `k` passages similar to `text`.
    async fn query_similar(&self, text: &str, k: usize) -> AppResult<Vec<Passage>>;
}

/// Build the configured store.
///
/// `default_path` is used by the memory store when the settings name no
/// passage file.
pub async fn create_store(
    settings: &RetrievalSettings,
    default_path: &Path,
) -> AppResult<Arc<dyn DocumentStore>> {
    let embedder: Arc<dyn EmbeddingProvider> = create_provider(&settings.embedding)?;

    match &settings.store {
        StoreSettings::Memory { path } => {
            let path = path.as_deref().unwrap_or(default_path);
            let store = MemoryStore::from_jsonl(path, embedder).await?;
            Ok(Arc::new(store))
        }
        StoreSettings::Qdrant {
            url,
            collection,
            api_key_env,
        } => {
            let api_key = api_key_env.as_ref().and_then(|var| std::env::var(var).ok());
            let store = QdrantStore::new(url, collection, embedder)?.with_api_key(api_key);
            Ok(Arc::new(store))
        }
    }
}

/// SHA-256 content id for passages stored without one.
pub fn content_id(source: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\n");
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
