//! Generation provider crate for govbrief.
//!
//! This crate provides a provider-agnostic abstraction for streaming
//! completions from Large Language Models.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI-compatible**: OpenAI, Groq and other `/v1/chat/completions` hosts
//! - **Scripted**: deterministic replay for tests and offline runs
//!
//! # Example
//! ```no_run
//! use futures::StreamExt;
//! use govbrief_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What is devolution?", "llama3.2");
//! let mut stream = client.stream(&request).await?;
//! while let Some(chunk) = stream.next().await {
//!     print!("{}", chunk?.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiCompatClient, Script, ScriptedClient};
pub use types::{OutputSchema, ProviderType};
