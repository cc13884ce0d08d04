//! Generation provider factory.
//!
//! Resolves a provider name (and its optional config block) into a shared
//! client handle. Handles are built once per process and injected into
//! every request.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiCompatClient, ScriptedClient};
use crate::types::ProviderType;
use govbrief_core::config::ProviderConfig;
use govbrief_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a generation client.
///
/// When a config block exists its shape decides the implementation;
/// otherwise the provider name is matched against the known providers.
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - Required secrets are missing
pub fn create_client(
    provider: &str,
    provider_config: Option<&ProviderConfig>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider_config {
        Some(ProviderConfig::Ollama {
            endpoint, timeout, ..
        }) => {
            let mut client = OllamaClient::with_base_url(endpoint.as_str());
            if let Some(secs) = timeout {
                client = client.with_connect_timeout(Duration::from_secs(*secs));
            }
            Ok(Arc::new(client))
        }
        Some(ProviderConfig::OpenAiCompat {
            endpoint,
            organization_env,
            api_key_env,
            ..
        }) => {
            let key = api_key.ok_or_else(|| {
                AppError::Config(format!(
                    "Provider '{}' requires an API key (set {})",
                    provider, api_key_env
                ))
            })?;
            let organization = organization_env
                .as_ref()
                .and_then(|var| std::env::var(var).ok());
            let client =
                OpenAiCompatClient::new(key, endpoint.as_deref()).with_organization(organization);
            Ok(Arc::new(client))
        }
        Some(ProviderConfig::Scripted {
            responses,
            chunk_chars,
        }) => {
            let mut client = ScriptedClient::new(responses.iter().cloned());
            if let Some(size) = chunk_chars {
                client = client.with_chunk_chars(*size);
            }
            Ok(Arc::new(client))
        }
        None => match ProviderType::parse(provider) {
            Some(ProviderType::Ollama) => Ok(Arc::new(OllamaClient::new())),
            Some(ProviderType::OpenAiCompat) => {
                let key = api_key.ok_or_else(|| {
                    AppError::Config("OpenAI provider requires API key".to_string())
                })?;
                Ok(Arc::new(OpenAiCompatClient::new(key, None)))
            }
            Some(ProviderType::Scripted) => Err(AppError::Config(
                "Scripted provider requires a 'responses' list in llm.providers".to_string(),
            )),
            None => Err(AppError::Config(format!("Unknown provider: {}", provider))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let config = ProviderConfig::Ollama {
            endpoint: "http://localhost:8080".to_string(),
            model: "llama3.2".to_string(),
            timeout: Some(10),
        };
        let client = create_client("local", Some(&config), None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None) {
            Err(err) => assert!(err.to_string().contains("requires API key")),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_named_openai_compat_entry() {
        let config = ProviderConfig::OpenAiCompat {
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            endpoint: Some("https://api.groq.com/openai".to_string()),
            organization_env: None,
        };
        let client = create_client("groq", Some(&config), Some("secret")).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_scripted_from_config() {
        let config = ProviderConfig::Scripted {
            responses: vec!["canned".to_string()],
            chunk_chars: Some(3),
        };
        let client = create_client("stub", Some(&config), None).unwrap();
        assert_eq!(client.provider_name(), "scripted");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
