//! OpenAI-compatible chat completions provider.
//!
//! Works against any host exposing `/v1/chat/completions` with SSE
//! streaming (OpenAI, Groq, LM Studio, vLLM).

use crate::client::{LlmClient, LlmRequest, LlmStream, LlmStreamChunk};
use crate::providers::{error_body, line_stream};
use crate::types::OutputSchema;
use futures::StreamExt;
use govbrief_core::{AppError, AppResult};
use serde_json::{json, Value};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    organization: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(api_key: impl Into<String>, endpoint: Option<&str>) -> Self {
        Self {
            base_url: endpoint
                .unwrap_or(DEFAULT_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            organization: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization;
        self
    }

    fn request_body(&self, request: &LlmRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "stream": true,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(m) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(m));
            }
            if let Some(OutputSchema::JsonObject) = request.schema {
                obj.insert("response_format".to_string(), json!({ "type": "json_object" }));
            }
        }

        body
    }
}

/// Decode one SSE line. Comments, event names and empty deltas yield `None`.
fn parse_sse_line(line: &str, model: &str) -> Option<AppResult<LlmStreamChunk>> {
    let data = line.strip_prefix("data:")?.trim();

    if data == "[DONE]" {
        return Some(Ok(LlmStreamChunk {
            content: String::new(),
            model: model.to_string(),
            done: true,
            usage: None,
        }));
    }

    let payload: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return Some(Err(AppError::Llm(format!("Failed to parse chunk: {}", e)))),
    };

    if let Some(message) = payload["error"]["message"].as_str() {
        return Some(Err(AppError::Llm(format!("Provider error: {}", message))));
    }

    let content = payload["choices"][0]["delta"]["content"].as_str()?;
    if content.is_empty() {
        return None;
    }

    Some(Ok(LlmStreamChunk::text(content, model)))
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to {}", self.base_url);

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request));

        if let Some(org) = &self.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send streaming request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_body(response).await;
            return Err(AppError::Llm(format!(
                "Chat completions error ({}): {}",
                status, error_text
            )));
        }

        let model = request.model.clone();
        let chunks = line_stream(response.bytes_stream()).filter_map(move |line| {
            let parsed = match line {
                Ok(line) => parse_sse_line(&line, &model),
                Err(e) => Some(Err(e)),
            };
            futures::future::ready(parsed)
        });

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_includes_system_and_format() {
        let client = OpenAiCompatClient::new("key", Some("https://api.groq.com/openai/"));
        assert_eq!(client.base_url, "https://api.groq.com/openai");

        let request = LlmRequest::new("Question", "llama-3.3-70b-versatile")
            .with_system("System")
            .with_temperature(0.2)
            .with_schema(OutputSchema::JsonObject);
        let body = client.request_body(&request);

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Question");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_parse_sse_line_variants() {
        let chunk = parse_sse_line(
            r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#,
            "m",
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk.content, "Hello");
        assert!(!chunk.done);

        let done = parse_sse_line("data: [DONE]", "m").unwrap().unwrap();
        assert!(done.done);

        assert!(parse_sse_line(": keep-alive", "m").is_none());
        assert!(parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#, "m").is_none());
        assert!(parse_sse_line(r#"data: {"error":{"message":"rate limited"}}"#, "m")
            .unwrap()
            .is_err());
    }
}
