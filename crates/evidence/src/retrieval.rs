//! Retrieval adapter: the policy wrapped around a document store.
//!
//! Queries are bounded by a shared semaphore and a per-attempt timeout,
//! retried a fixed number of times, and never fail: a store that keeps
//! failing yields an empty, degraded result.

use crate::store::DocumentStore;
use crate::types::{Passage, Retrieval};
use govbrief_core::config::RetrievalSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Clone)]
pub struct RetrievalAdapter {
    store: Arc<dyn DocumentStore>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    retries: u32,
}

impl RetrievalAdapter {
    pub fn new(store: Arc<dyn DocumentStore>, settings: &RetrievalSettings) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(settings.max_concurrency.max(1))),
            timeout: Duration::from_secs(settings.timeout_secs),
            retries: settings.retries,
        }
    }

    /// Override the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Fetch up to `k` passages ordered by non-increasing relevance.
    pub async fn retrieve(&self, query: &str, k: usize) -> Retrieval {
        if k == 0 {
            return Retrieval::default();
        }

        let attempts = self.retries + 1;

        for attempt in 1..=attempts {
            let _permit = match self.permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::warn!("Retrieval pool closed");
                    break;
                }
            };

            match tokio::time::timeout(self.timeout, self.store.query_similar(query, k)).await {
                Ok(Ok(passages)) => {
                    let passages = rank(passages, k);
                    tracing::debug!(
                        store = self.store.name(),
                        attempt,
                        count = passages.len(),
                        "Retrieved passages"
                    );
                    return Retrieval {
                        passages,
                        degraded: false,
                    };
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        store = self.store.name(),
                        attempt,
                        error = %e,
                        "Document store query failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        store = self.store.name(),
                        attempt,
                        "Document store query timed out after {:?}",
                        self.timeout
                    );
                }
            }
        }

        tracing::warn!(
            store = self.store.name(),
            "Retrieval degraded after {} attempts; continuing without evidence",
            attempts
        );
        Retrieval::degraded()
    }
}

/// Stable sort by descending relevance, then keep the top `k`.
fn rank(mut passages: Vec<Passage>, k: usize) -> Vec<Passage> {
    passages.sort_by(|a, b| {
        b.relevance()
            .partial_cmp(&a.relevance())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    passages.truncate(k);
    passages
}

#[cfg(test)]
mod tests {
    use super::*;
    use govbrief_core::{AppError, AppResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fails (or hangs) for the first `failures` calls, then answers.
    struct FlakyStore {
        failures: usize,
        hang: bool,
        calls: AtomicUsize,
        passages: Vec<Passage>,
    }

    impl FlakyStore {
        fn new(failures: usize, hang: bool, passages: Vec<Passage>) -> Self {
            Self {
                failures,
                hang,
                calls: AtomicUsize::new(0),
                passages,
            }
        }
    }

    #[async_trait::async_trait]
    impl DocumentStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn query_similar(&self, _text: &str, _k: usize) -> AppResult<Vec<Passage>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                if self.hang {
                    std::future::pending::<()>().await;
                }
                return Err(AppError::Retrieval("connection refused".to_string()));
            }
            Ok(self.passages.clone())
        }
    }

    fn passages() -> Vec<Passage> {
        vec![
            Passage::new("a", "low", "A.pdf", 0.2),
            Passage::new("b", "high", "B.pdf", 0.9),
            Passage::new("c", "tie-1", "C.pdf", 0.5),
            Passage::new("d", "tie-2", "D.pdf", 0.5),
        ]
    }

    fn adapter(store: FlakyStore) -> (RetrievalAdapter, Arc<FlakyStore>) {
        let store = Arc::new(store);
        let adapter = RetrievalAdapter::new(store.clone(), &RetrievalSettings::default())
            .with_timeout(Duration::from_millis(50));
        (adapter, store)
    }

    #[tokio::test]
    async fn test_sorted_stable_and_truncated() {
        let (adapter, _) = adapter(FlakyStore::new(0, false, passages()));
        let retrieval = adapter.retrieve("q", 3).await;

        assert!(!retrieval.degraded);
        let ids: Vec<&str> = retrieval.passages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_one_retry_recovers() {
        let (adapter, store) = adapter(FlakyStore::new(1, false, passages()));
        let retrieval = adapter.retrieve("q", 5).await;

        assert!(!retrieval.degraded);
        assert_eq!(retrieval.passages.len(), 4);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_failure_degrades() {
        let (adapter, store) = adapter(FlakyStore::new(usize::MAX, false, passages()));
        let retrieval = adapter.retrieve("q", 5).await;

        assert!(retrieval.degraded);
        assert!(retrieval.passages.is_empty());
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let (adapter, store) = adapter(FlakyStore::new(usize::MAX, true, passages()));
        let retrieval = adapter.retrieve("q", 5).await;

        assert!(retrieval.degraded);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_k_skips_store() {
        let (adapter, store) = adapter(FlakyStore::new(0, false, passages()));
        let retrieval = adapter.retrieve("q", 0).await;
        assert!(retrieval.passages.is_empty());
        assert!(!retrieval.degraded);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        struct CountingStore {
            active: AtomicUsize,
            peak: Mutex<usize>,
        }

        #[async_trait::async_trait]
        impl DocumentStore for CountingStore {
            fn name(&self) -> &str {
                "counting"
            }

            async fn query_similar(&self, _text: &str, _k: usize) -> AppResult<Vec<Passage>> {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                if let Ok(mut peak) = self.peak.lock() {
                    *peak = (*peak).max(now);
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                Ok(Vec::new())
            }
        }

        let store = Arc::new(CountingStore {
            active: AtomicUsize::new(0),
            peak: Mutex::new(0),
        });
        let settings = RetrievalSettings {
            max_concurrency: 2,
            ..RetrievalSettings::default()
        };
        let adapter = RetrievalAdapter::new(store.clone(), &settings);

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let adapter = adapter.clone();
                tokio::spawn(async move { adapter.retrieve("q", 1).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(*store.peak.lock().unwrap() <= 2);
    }
}
