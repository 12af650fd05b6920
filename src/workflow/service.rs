use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::llm::ImagePayload;
use crate::models::{ErrorBody, FaceAnalysis, StyleImageResponse};
use crate::server::multipart::IMAGE_FIELD;
use crate::utils::http::get_http_client;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// The two external collaborators the workflow talks to.
#[async_trait]
pub trait StyleService: Send + Sync + 'static {
    async fn analyze(&self, image: &ImagePayload) -> Result<FaceAnalysis, ServiceError>;

    async fn generate_style(
        &self,
        image: &ImagePayload,
        style_prompt: &str,
        style_name: &str,
    ) -> Result<StyleImageResponse, ServiceError>;
}

/// Talks to a running proxy over `/api/analyze` and `/api/generate-style`.
#[derive(Debug, Clone)]
pub struct HttpStyleService {
    analyze_url: Url,
    generate_url: Url,
}

impl HttpStyleService {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            analyze_url: base.join("api/analyze")?,
            generate_url: base.join("api/generate-style")?,
        })
    }

    pub fn analyze_url(&self) -> &Url {
        &self.analyze_url
    }

    fn image_part(image: &ImagePayload) -> Result<Part, ServiceError> {
        let file_name = image
            .file_name
            .clone()
            .unwrap_or_else(|| "selfie".to_string());
        Part::bytes(image.bytes.clone())
            .file_name(file_name)
            .mime_str(&image.mime_type)
            .map_err(|err| ServiceError::Transport(err.to_string()))
    }

    async fn rejection(response: Response, fallback: &str) -> ServiceError {
        let status = response.status().as_u16();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|body| body.error)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());
        ServiceError::Rejected { status, message }
    }
}

#[async_trait]
impl StyleService for HttpStyleService {
    async fn analyze(&self, image: &ImagePayload) -> Result<FaceAnalysis, ServiceError> {
        let form = Form::new().part(IMAGE_FIELD, Self::image_part(image)?);
        let response = get_http_client()
            .post(self.analyze_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response, "Analysis failed").await);
        }

        response
            .json::<FaceAnalysis>()
            .await
            .map_err(|err| ServiceError::Decode(err.to_string()))
    }

    async fn generate_style(
        &self,
        image: &ImagePayload,
        style_prompt: &str,
        style_name: &str,
    ) -> Result<StyleImageResponse, ServiceError> {
        debug!(style_name, "Requesting style image");
        let form = Form::new()
            .part(IMAGE_FIELD, Self::image_part(image)?)
            .text("stylePrompt", style_prompt.to_string())
            .text("styleName", style_name.to_string());
        let response = get_http_client()
            .post(self.generate_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response, "Generation failed").await);
        }

        response
            .json::<StyleImageResponse>()
            .await
            .map_err(|err| ServiceError::Decode(err.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    /// In-memory stand-in for both collaborators.
    #[derive(Default)]
    pub struct FakeStyleService {
        pub analysis: Mutex<Option<Result<FaceAnalysis, String>>>,
        pub analyze_delay: Duration,
        pub failing_styles: HashSet<String>,
        pub style_delays: HashMap<String, Duration>,
        pub analyze_calls: Mutex<usize>,
        pub generate_calls: Mutex<Vec<String>>,
    }

    impl FakeStyleService {
        pub fn succeeding(analysis: FaceAnalysis) -> Self {
            Self {
                analysis: Mutex::new(Some(Ok(analysis))),
                ..Self::default()
            }
        }

        pub fn rejecting(message: &str) -> Self {
            Self {
                analysis: Mutex::new(Some(Err(message.to_string()))),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl StyleService for FakeStyleService {
        async fn analyze(&self, _image: &ImagePayload) -> Result<FaceAnalysis, ServiceError> {
            *self.analyze_calls.lock() += 1;
            if !self.analyze_delay.is_zero() {
                tokio::time::sleep(self.analyze_delay).await;
            }
            match self.analysis.lock().clone() {
                Some(Ok(analysis)) => Ok(analysis),
                Some(Err(message)) => Err(ServiceError::Rejected {
                    status: 500,
                    message,
                }),
                None => Err(ServiceError::Transport("connection refused".to_string())),
            }
        }

        async fn generate_style(
            &self,
            image: &ImagePayload,
            _style_prompt: &str,
            style_name: &str,
        ) -> Result<StyleImageResponse, ServiceError> {
            self.generate_calls.lock().push(style_name.to_string());
            if let Some(delay) = self.style_delays.get(style_name) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing_styles.contains(style_name) {
                return Err(ServiceError::Rejected {
                    status: 500,
                    message: "Generation failed".to_string(),
                });
            }
            Ok(StyleImageResponse {
                image: format!("{}#{}", image.to_data_uri(), style_name),
                text: Some(format!("{style_name} 완료")),
            })
        }
    }
}
