//! Stateless HTTP proxy between the browser workflow and Gemini.

pub mod handlers;
pub mod multipart;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::CONFIG;
use crate::llm::{self, ImagePayload, StyleGenerationOutput};
use crate::models::FaceAnalysis;

/// Room for multipart boundaries and text fields on top of the image limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// The upstream model calls behind both API routes.
#[async_trait]
pub trait ProxyBackend: Send + Sync {
    async fn analyze(&self, image: &ImagePayload) -> Result<FaceAnalysis>;

    async fn generate_style(
        &self,
        image: &ImagePayload,
        style_prompt: &str,
        style_name: &str,
    ) -> Result<StyleGenerationOutput>;
}

pub struct GeminiBackend;

#[async_trait]
impl ProxyBackend for GeminiBackend {
    async fn analyze(&self, image: &ImagePayload) -> Result<FaceAnalysis> {
        llm::analyze_face(image).await
    }

    async fn generate_style(
        &self,
        image: &ImagePayload,
        style_prompt: &str,
        style_name: &str,
    ) -> Result<StyleGenerationOutput> {
        llm::generate_style(image, style_prompt, style_name).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ProxyBackend>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(backend: Arc<dyn ProxyBackend>, max_upload_bytes: usize) -> Self {
        Self {
            backend,
            max_upload_bytes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/generate-style", post(handlers::generate_style))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(port: u16) -> Result<()> {
    let state = AppState::new(Arc::new(GeminiBackend), CONFIG.max_upload_bytes);
    let address = format!("{}:{}", CONFIG.bind_address, port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(
        "Serving on http://{} (model={}, image_model={}, style_mode={})",
        listener.local_addr()?,
        CONFIG.gemini_model,
        CONFIG.gemini_image_model,
        CONFIG.style_generation_mode.as_str()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
