//! Prompt types for govbrief.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Behavioral settings
    pub behavior: PromptBehavior,

    /// System message, sent verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User message template with Handlebars syntax
    pub template: String,

    /// Expected output shape
    pub output: PromptOutputSpec,
}

/// Behavioral settings for prompt execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// Tone (e.g., "professional")
    pub tone: String,

    /// Style (e.g., "structured", "strict")
    pub style: String,
}

/// Expected output shape for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format ("markdown" or "json")
    pub format: String,
}

impl PromptOutputSpec {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// One document excerpt handed to a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDocument {
    pub source: String,
    pub text: String,
}

/// One news item handed to a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArticle {
    pub title: String,
    pub text: String,
}

/// Values rendered into a prompt template.
///
/// Empty `news` and `None` sentiment render no section at all.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptInputs {
    pub question: String,
    pub documents: Vec<PromptDocument>,
    pub news: Vec<PromptArticle>,
    pub sentiment: Option<String>,
}

impl PromptInputs {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Whether the provider should be asked for JSON output
    #[serde(rename = "expectsJson")]
    pub expects_json: bool,

    /// Number of document excerpts rendered
    #[serde(rename = "documentCount")]
    pub document_count: usize,

    /// Whether a news section was rendered
    #[serde(rename = "newsIncluded")]
    pub news_included: bool,

    /// Whether a sentiment section was rendered
    #[serde(rename = "sentimentIncluded")]
    pub sentiment_included: bool,
}
