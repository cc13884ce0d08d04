//! Evidence layer for govbrief.
//!
//! Everything the engine consumes from the outside world sits behind a
//! narrow trait here:
//! - [`DocumentStore`]: similarity search over document passages
//! - [`NewsService`]: recent articles about a topic
//! - [`SentimentService`]: aggregate sentiment over articles
//!
//! [`RetrievalAdapter`] wraps a store with the bounded, retrying,
//! never-failing retrieval policy.

pub mod embeddings;
pub mod news;
pub mod retrieval;
pub mod sentiment;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider};
pub use news::{extract_keywords, GdeltNews, NewsService};
pub use retrieval::RetrievalAdapter;
pub use sentiment::{LexiconSentiment, SentimentService};
pub use store::{create_store, DocumentStore, MemoryStore, QdrantStore};
pub use types::{clamp_relevance, Article, Passage, Retrieval, SentimentLabel, SentimentSummary};
