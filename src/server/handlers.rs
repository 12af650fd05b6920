use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Html;
use axum::Json;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::models::{FaceAnalysis, StyleImageResponse};
use crate::server::multipart::read_upload_form;
use crate::server::AppState;
use crate::utils::timing::RouteTimer;
use crate::view::components;

pub async fn index() -> Html<String> {
    Html(components::upload_page())
}

fn finish<T>(timer: &mut RouteTimer, result: &Result<T, ApiError>) {
    match result {
        Ok(_) => timer.complete("success", None),
        Err(err) => timer.complete(err.status().as_str(), Some(err.to_string())),
    }
}

/// A body that is not multipart at all carries no image.
fn accept_multipart(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Multipart, ApiError> {
    multipart.map_err(|rejection| {
        warn!("Rejected non-multipart upload: {rejection}");
        ApiError::MissingImage
    })
}

pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FaceAnalysis>, ApiError> {
    let mut timer = RouteTimer::start("/api/analyze");
    let result = run_analyze(&state, multipart).await;
    finish(&mut timer, &result);
    result.map(Json)
}

async fn run_analyze(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<FaceAnalysis, ApiError> {
    let form = read_upload_form(accept_multipart(multipart)?, state.max_upload_bytes).await?;
    let image = form.require_image()?;
    info!(
        mime = %image.mime_type,
        bytes = image.bytes.len(),
        "Analyze request received"
    );

    let analysis = state.backend.analyze(image).await.map_err(|err| {
        warn!("Face analysis failed: {err:#}");
        ApiError::Analysis(err.to_string())
    })?;
    info!(
        face_type = %analysis.face_type,
        recommendations = analysis.recommendations.len(),
        "Analysis complete"
    );
    Ok(analysis)
}

pub async fn generate_style(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StyleImageResponse>, ApiError> {
    let mut timer = RouteTimer::start("/api/generate-style");
    let result = run_generate_style(&state, multipart).await;
    finish(&mut timer, &result);
    result.map(Json)
}

async fn run_generate_style(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StyleImageResponse, ApiError> {
    let form = read_upload_form(accept_multipart(multipart)?, state.max_upload_bytes).await?;
    let image = form.require_image()?;
    let style_prompt = form.text("stylePrompt").ok_or(ApiError::MissingStylePrompt)?;
    let style_name = form.text("styleName").unwrap_or_default();
    info!(style_name, "Style generation request received");

    let output = state
        .backend
        .generate_style(image, style_prompt, style_name)
        .await
        .map_err(|err| {
            warn!(style_name, "Style generation failed: {err:#}");
            ApiError::Generation(err.to_string())
        })?;

    Ok(StyleImageResponse {
        image: output.image_data_uri,
        text: output.text,
    })
}
