//! Provider identification and structured-output types.

use serde::{Deserialize, Serialize};

/// Structured output a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSchema {
    /// A single JSON object, no surrounding prose
    JsonObject,
}

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAiCompat,
    Ollama,
    Scripted,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "groq" | "openai-compatible" => Some(Self::OpenAiCompat),
            "ollama" => Some(Self::Ollama),
            "scripted" | "stub" => Some(Self::Scripted),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAiCompat => "openai",
            Self::Ollama => "ollama",
            Self::Scripted => "scripted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("openai"), Some(ProviderType::OpenAiCompat));
        assert_eq!(ProviderType::parse("Groq"), Some(ProviderType::OpenAiCompat));
        assert_eq!(ProviderType::parse("ollama"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("stub"), Some(ProviderType::Scripted));
        assert_eq!(ProviderType::parse("unknown"), None);
    }

    #[test]
    fn test_schema_serialization() {
        let json = serde_json::to_string(&OutputSchema::JsonObject).unwrap();
        assert_eq!(json, "\"json_object\"");
    }
}
