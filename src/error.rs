use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::ErrorBody;

/// Failures surfaced by the proxy routes, always rendered as `{error}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("이미지가 필요합니다")]
    MissingImage,
    #[error("스타일 프롬프트가 필요합니다")]
    MissingStylePrompt,
    #[error("이미지 용량이 너무 큽니다 (최대 {limit_bytes} bytes)")]
    PayloadTooLarge { limit_bytes: usize },
    #[error("잘못된 업로드 요청입니다: {0}")]
    BadUpload(String),
    #[error("분석 중 오류가 발생했습니다: {0}")]
    Analysis(String),
    #[error("생성 중 오류가 발생했습니다: {0}")]
    Generation(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage | ApiError::MissingStylePrompt | ApiError::BadUpload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Analysis(_) | ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
