//! Retrieve command handler.
//!
//! Queries the configured document store the same way a request would,
//! useful for checking what evidence a question will be grounded on.

use clap::Args;
use govbrief_core::{config::AppConfig, AppResult};
use govbrief_evidence::{create_store, RetrievalAdapter};

/// Show the passages retrieved for a question
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// The question to retrieve evidence for
    pub question: String,

    /// Number of passages to return (default: retrieval.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RetrieveCommand {
    /// Execute the retrieve command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = create_store(&config.retrieval, &config.default_passages_path()).await?;
        let adapter = RetrievalAdapter::new(store, &config.retrieval);
        let k = self.top_k.unwrap_or(config.retrieval.top_k);

        tracing::info!(store = adapter.store_name(), k, "Retrieving passages");
        let retrieval = adapter.retrieve(&self.question, k).await;

        if self.json {
            let output = serde_json::json!({
                "store": adapter.store_name(),
                "degraded": retrieval.degraded,
                "passages": retrieval.passages,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        if retrieval.degraded {
            eprintln!("Store unavailable; no passages retrieved.");
        } else if retrieval.passages.is_empty() {
            println!("No passages found.");
        }

        for (i, passage) in retrieval.passages.iter().enumerate() {
            println!("{}. [{:.2}] {} ({})", i + 1, passage.relevance(), passage.source, passage.id);
            println!("   {}", passage.text.trim());
        }
        Ok(())
    }
}
