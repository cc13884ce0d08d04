use super::{ApiError, AppState};
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream;
use govbrief_core::AppError;
use govbrief_engine::{Classification, FrameEncoder, Query, SseEncoder, FRAME_BUFFER};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;
    Json(json!({
        "status": "ok",
        "provider": orchestrator.provider_name(),
        "model": orchestrator.model(),
        "store": orchestrator.retrieval().store_name(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub message: String,
}

pub async fn classify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<Classification>, ApiError> {
    Ok(Json(state.orchestrator.classify(&request.message)?))
}

/// Stream a request's frames as server-sent events.
///
/// Validation happens before the response starts so an empty message is a
/// plain 400. Once streaming, failures arrive in-band as content frames.
/// A client that goes away drops the body, closing the frame channel and
/// cancelling generation.
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(query): Json<Query>,
) -> Result<Response, ApiError> {
    let classification = state.orchestrator.classify(&query.message)?;

    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        match orchestrator.run_classified(&query, &classification, tx).await {
            Ok(_) | Err(AppError::Cancelled) => {}
            Err(e) => tracing::error!("Chat stream ended with error: {}", e),
        }
    });

    let body = stream::unfold(rx, |mut rx| async move {
        let frame = rx.recv().await?;
        let event = SseEncoder.encode(&frame).map_err(std::io::Error::other);
        Some((event, rx))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, SseEncoder.content_type())
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .body(Body::from_stream(body))
        .map_err(ApiError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use govbrief_core::config::{AppConfig, RetrievalSettings, ServerSettings};
    use govbrief_engine::{Orchestrator, PromptSet};
    use govbrief_evidence::embeddings::TrigramProvider;
    use govbrief_evidence::{MemoryStore, Passage, RetrievalAdapter};
    use govbrief_llm::ScriptedClient;

    async fn state(answer: &str) -> Arc<AppState> {
        let passages = vec![Passage::new(
            "p-1",
            "Turkana has one nurse per 2,000 residents.",
            "Health Review 2024",
            0.9,
        )];
        let store = MemoryStore::from_passages(passages, Arc::new(TrigramProvider::new(64)))
            .await
            .unwrap();
        let retrieval = RetrievalAdapter::new(Arc::new(store), &RetrievalSettings::default());
        let llm = Arc::new(ScriptedClient::new([answer.to_string()]));
        let orchestrator = Orchestrator::new(
            &AppConfig::default(),
            llm,
            retrieval,
            PromptSet::builtin().unwrap(),
        );
        AppState::new(orchestrator, ServerSettings::default())
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_message_is_bad_request() {
        let query: Query = serde_json::from_str(r#"{"message": "  "}"#).unwrap();
        let response = chat_stream(State(state("unused").await), Json(query))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stream_emits_sse_frames_in_order() {
        let query: Query = serde_json::from_str(
            r#"{"message": "Explain nurse staffing", "include_news": false, "include_sentiment": false}"#,
        )
        .unwrap();
        let response = chat_stream(State(state("Staffing is thin.").await), Json(query))
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        let text = body_text(response).await;
        let events: Vec<&str> = text.split("\n\n").filter(|e| !e.is_empty()).collect();
        assert!(events.iter().all(|e| e.starts_with("data: ")));
        assert!(events.first().unwrap().contains(r#""type":"content""#));
        assert!(events.last().unwrap().contains(r#""type":"citations""#));
        assert!(events.last().unwrap().contains("Health Review 2024"));
    }

    #[tokio::test]
    async fn test_classify_endpoint() {
        let request = ClassifyRequest {
            message: "Should Kenya expand healthcare?".to_string(),
        };
        let Json(classification) = classify(State(state("unused").await), Json(request))
            .await
            .unwrap();
        assert_eq!(classification.kind.as_str(), "decision");
    }

    #[tokio::test]
    async fn test_health_reports_provider_and_store() {
        let response = health(State(state("unused").await)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains(r#""status":"ok""#));
        assert!(text.contains(r#""provider":"scripted""#));
    }
}
