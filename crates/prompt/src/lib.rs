//! Prompt system for govbrief.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, built in and overridable per workspace
//! - Handlebars template rendering of question and evidence

pub mod builder;
pub mod loader;
pub mod types;

/// Free-form policy analysis.
pub const NARRATIVE_PROMPT_ID: &str = "govbrief.narrative";
/// Structured decision report.
pub const REPORT_PROMPT_ID: &str = "govbrief.report";
/// Decision report repair after an unparseable answer.
pub const STRICT_REPORT_PROMPT_ID: &str = "govbrief.report.strict";

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, list_prompts, load_prompt};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptArticle, PromptBehavior, PromptDefinition,
    PromptDocument, PromptInputs, PromptOutputSpec,
};
