//! Request pipeline for govbrief.
//!
//! A question flows through the [`QueryClassifier`], the retrieval
//! adapter and [`ContextAssembler`], then the [`Orchestrator`] streams
//! either a narrative or a single decision report, followed by citations.
//! Output leaves as typed [`Frame`]s that any [`FrameEncoder`] can put on
//! the wire.
//!
//! # Example
//! ```no_run
//! use govbrief_core::config::AppConfig;
//! use govbrief_engine::{Orchestrator, Query};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let orchestrator = Orchestrator::from_config(&config).await?;
//! let (_, frames) = orchestrator
//!     .collect(&Query::new("Should Kenya expand healthcare?"))
//!     .await?;
//! println!("{} frames", frames.len());
//! # Ok(())
//! # }
//! ```

pub mod citations;
pub mod classifier;
pub mod context;
pub mod orchestrator;
pub mod query;
pub mod report;
pub mod transport;

#[cfg(test)]
mod tests;

// Re-export main types
pub use citations::{derive_citations, Citation};
pub use classifier::{Classification, QueryClassifier, QueryKind};
pub use context::{ContextAssembler, ContextWindow, Enrichment};
pub use orchestrator::{
    Clock, Orchestrator, PipelineState, PromptSet, RunOutcome, FALLBACK_CAVEAT, FRAME_BUFFER,
};
pub use query::Query;
pub use report::{decode_report, DecisionReport};
pub use transport::{Frame, FrameEncoder, NdjsonEncoder, SseEncoder};
