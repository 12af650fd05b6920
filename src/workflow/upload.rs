use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::ImageReader;
use tracing::debug;

use crate::llm::ImagePayload;

/// A file handed over by the (single-select) picker.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub bytes: Vec<u8>,
    pub declared_mime: Option<String>,
    pub file_name: Option<String>,
}

impl SelectedFile {
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let declared_mime = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(mime_for_extension)
            .map(str::to_string);
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);
        Ok(Self {
            bytes,
            declared_mime,
            file_name,
        })
    }
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub data_uri: String,
    pub dimensions: Option<(u32, u32)>,
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub payload: ImagePayload,
    pub preview: ImagePreview,
}

/// Decodes the selection into something previewable. Type and size checks
/// are left to the analyze service.
pub fn prepare_upload(file: SelectedFile) -> UploadedImage {
    let payload = ImagePayload::new(file.bytes, file.declared_mime.as_deref(), file.file_name);
    let dimensions = ImageReader::new(Cursor::new(&payload.bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());
    if dimensions.is_none() {
        debug!(mime = %payload.mime_type, "Preview dimensions unavailable");
    }
    let preview = ImagePreview {
        data_uri: payload.to_data_uri(),
        dimensions,
    };
    UploadedImage { payload, preview }
}

/// What the upload screen needs to draw itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStageView {
    pub preview: Option<ImagePreview>,
    pub analyze_enabled: bool,
}

impl UploadStageView {
    pub fn from_image(image: Option<&UploadedImage>) -> Self {
        Self {
            preview: image.map(|image| image.preview.clone()),
            analyze_enabled: image.is_some(),
        }
    }
}
