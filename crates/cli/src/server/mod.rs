//! HTTP surface: a streaming chat endpoint, a classification probe and a
//! health check.

mod error;
mod handlers;

pub use error::ApiError;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use govbrief_core::config::ServerSettings;
use govbrief_engine::Orchestrator;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state behind every handler.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub settings: ServerSettings,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, settings: ServerSettings) -> Arc<Self> {
        Arc::new(Self {
            orchestrator: Arc::new(orchestrator),
            settings,
        })
    }
}

/// Creates the application router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings);
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/chat/stream", post(handlers::chat_stream))
        .route("/api/chat/classify", post(handlers::classify))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(settings: &ServerSettings) -> CorsLayer {
    let origins = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
