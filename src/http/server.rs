use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span};
use uuid::Uuid;

use super::error::GatewayError;
use super::types::{ChatMessage, ExtractResponse};
use crate::config::ServerConfig;
use crate::routes::extract_pdf_route::ExtractPdfRoute;
use crate::routes::summarise_route::SummariseRoute;
use crate::utils::completion::CompletionProvider;

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    extract_pdf: Arc<ExtractPdfRoute>,
    summarise: Arc<SummariseRoute>,
}

impl AppState {
    pub fn new(provider: Arc<dyn CompletionProvider>, max_message_chars: usize) -> Self {
        Self {
            extract_pdf: Arc::new(ExtractPdfRoute::new()),
            summarise: Arc::new(SummariseRoute::new(provider, max_message_chars)),
        }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/extract-pdf",
            post(handle_extract_pdf).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/summarise", post(handle_summarise))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_extract_pdf(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ExtractResponse>, GatewayError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    match state.extract_pdf.execute(content_type, body).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            error!("Error extracting PDF text: {}", e);
            Err(e)
        }
    }
}

async fn handle_summarise(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatMessage>, GatewayError> {
    match state.summarise.execute(&body).await {
        Ok(message) => Ok(Json(message)),
        Err(e @ GatewayError::InvalidRequest(_)) => {
            info!("Rejected summarise request: {}", e);
            Err(e)
        }
        Err(e) => {
            error!("Error generating summary: {}", e);
            Err(e)
        }
    }
}

pub struct HttpServer {
    config: ServerConfig,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: ServerConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let state = AppState::new(provider, config.max_message_chars);
        Self { config, state }
    }

    pub async fn start(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr)
            .await
            .with_context(|| format!("failed to bind {}", self.config.bind_addr))?;

        info!(
            "HTTP server listening on http://{}",
            listener.local_addr().context("failed to read local address")?
        );

        let app = router(self.state, self.config.max_upload_bytes);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server terminated with an error")?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
