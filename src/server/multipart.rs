use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::error::ApiError;
use crate::llm::ImagePayload;

/// Form field carrying the photo on both API routes.
pub const IMAGE_FIELD: &str = "selfie";

/// A parsed upload: at most one image plus any text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<ImagePayload>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn require_image(&self) -> Result<&ImagePayload, ApiError> {
        self.image
            .as_ref()
            .filter(|image| !image.is_empty())
            .ok_or(ApiError::MissingImage)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

fn map_multipart_error(err: MultipartError, limit_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit_bytes }
    } else {
        ApiError::BadUpload(err.body_text())
    }
}

pub async fn read_upload_form(
    mut multipart: Multipart,
    limit_bytes: usize,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| map_multipart_error(err, limit_bytes))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            // Single-select picker: a repeated field replaces the earlier one.
            let content_type = field.content_type().map(str::to_string);
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|err| map_multipart_error(err, limit_bytes))?;
            if bytes.len() > limit_bytes {
                return Err(ApiError::PayloadTooLarge { limit_bytes });
            }
            form.image = Some(ImagePayload::new(
                bytes.to_vec(),
                content_type.as_deref(),
                file_name,
            ));
        } else {
            let value = field
                .text()
                .await
                .map_err(|err| map_multipart_error(err, limit_bytes))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
