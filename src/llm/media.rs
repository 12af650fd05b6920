use base64::{engine::general_purpose, Engine as _};

/// Binary image plus its declared media type. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl ImagePayload {
    /// Builds a payload, resolving the media type from the declared value
    /// or, failing that, from the bytes themselves.
    pub fn new(bytes: Vec<u8>, declared_mime: Option<&str>, file_name: Option<String>) -> Self {
        let mime_type = resolve_image_mime(declared_mime, &bytes);
        Self {
            bytes,
            mime_type,
            file_name,
        }
    }

    pub fn base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn to_data_uri(&self) -> String {
        data_uri(&self.mime_type, &self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => lowered,
    }
}

pub fn gemini_supports_image_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif"
    )
}

fn resolve_image_mime(declared: Option<&str>, bytes: &[u8]) -> String {
    let mut candidates = Vec::new();
    if let Some(declared) = declared {
        if !declared.trim().is_empty() {
            candidates.push(declared.to_string());
        }
    }
    if let Some(detected) = detect_mime_type(bytes) {
        candidates.push(detected);
    }

    for candidate in &candidates {
        let normalized = normalize_image_mime(candidate);
        if gemini_supports_image_mime(&normalized) {
            return normalized;
        }
    }

    candidates
        .first()
        .map(|value| normalize_image_mime(value))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}
