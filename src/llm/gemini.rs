use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::{StyleGenerationMode, CONFIG};
use crate::llm::media::{data_uri, ImagePayload};
use crate::llm::prompts::{
    style_description_prompt, style_edit_prompt, ANALYZE_PROMPT, STYLE_EDIT_SYSTEM_PROMPT,
};
use crate::models::{FaceAnalysis, EXPECTED_RECOMMENDATIONS};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone)]
struct GeneratedImage {
    mime_type: String,
    bytes: Vec<u8>,
}

/// What `/api/generate-style` hands back for one recommendation.
#[derive(Debug, Clone)]
pub struct StyleGenerationOutput {
    pub image_data_uri: String,
    pub text: Option<String>,
}

fn redact_gemini_api_key(text: &str) -> String {
    let key = CONFIG.gemini_api_key.trim();
    if key.is_empty() {
        return text.to_string();
    }
    text.replace(key, "[redacted]")
}

fn build_safety_settings() -> Vec<Value> {
    let threshold = match CONFIG.gemini_safety_settings.as_str() {
        "standard" => "BLOCK_MEDIUM_AND_ABOVE",
        _ => "OFF",
    };

    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
    ]
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let mut summarized_contents = Vec::new();
        for content in contents {
            let parts = content
                .get("parts")
                .and_then(|value| value.as_array())
                .map(|parts| {
                    parts
                        .iter()
                        .map(|part| {
                            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                                json!({ "text": truncate_for_log(text, 200) })
                            } else if let Some(inline) = part.get("inlineData") {
                                let data_len = inline
                                    .get("data")
                                    .and_then(|value| value.as_str())
                                    .map(str::len)
                                    .unwrap_or(0);
                                json!({ "inlineData": {
                                    "mimeType": inline.get("mimeType").cloned().unwrap_or(Value::Null),
                                    "dataLen": data_len
                                } })
                            } else {
                                json!({ "unknownPart": true })
                            }
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            summarized_contents.push(json!({ "parts": parts }));
        }
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    Value::Object(summary)
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn inline_image_part(image: &ImagePayload) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.base64()
        }
    })
}

fn text_generation_config() -> Value {
    json!({
        "temperature": CONFIG.gemini_temperature,
        "topK": CONFIG.gemini_top_k,
        "topP": CONFIG.gemini_top_p,
        "maxOutputTokens": CONFIG.gemini_max_output_tokens,
    })
}

fn parts_of(response: GeminiResponse) -> impl Iterator<Item = GeminiPart> {
    response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .filter_map(|content| content.parts)
        .flatten()
}

fn split_response(response: GeminiResponse) -> (String, Vec<GeneratedImage>) {
    let mut text_parts = Vec::new();
    let mut images = Vec::new();
    for part in parts_of(response) {
        match part {
            GeminiPart::Text { text } => {
                if !text.trim().is_empty() {
                    text_parts.push(text);
                }
            }
            GeminiPart::InlineData { inline_data } => {
                if !inline_data.mime_type.starts_with("image/") {
                    continue;
                }
                match general_purpose::STANDARD.decode(inline_data.data.as_bytes()) {
                    Ok(bytes) => images.push(GeneratedImage {
                        mime_type: inline_data.mime_type,
                        bytes,
                    }),
                    Err(err) => warn!("Discarding undecodable Gemini image part: {err}"),
                }
            }
            GeminiPart::Other(value) => {
                debug!(
                    target: "llm.gemini",
                    part = %truncate_for_log(&value.to_string(), 200),
                    "Skipping unsupported response part"
                );
            }
        }
    }
    (text_parts.join(""), images)
}

/// One request, no retries: a failed call surfaces to the caller as-is.
async fn call_gemini_api(model: &str, payload: Value) -> Result<GeminiResponse> {
    let url = format!("{}/models/{}:generateContent", CONFIG.gemini_api_base, model);

    if tracing::enabled!(tracing::Level::DEBUG) {
        debug!(target: "llm.gemini", model = model, payload = %summarize_gemini_payload(&payload));
    }

    let response = get_http_client()
        .post(&url)
        .header("x-goog-api-key", &CONFIG.gemini_api_key)
        .timeout(Duration::from_secs(CONFIG.gemini_timeout_seconds.max(1)))
        .json(&payload)
        .send()
        .await
        .map_err(|err| {
            let err_text = redact_gemini_api_key(&err.to_string());
            warn!(
                "Gemini request failed to send: {} (timeout={}, connect={})",
                err_text,
                err.is_timeout(),
                err.is_connect()
            );
            anyhow!("Gemini request failed: {}", err_text)
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let (message, body_summary) = summarize_error_body(&body);
        warn!("Gemini API error: status={}, body={}", status, body_summary);
        let detail = redact_gemini_api_key(&message.unwrap_or(body_summary));
        return Err(anyhow!(
            "Gemini request failed with status {}: {}",
            status,
            detail
        ));
    }

    Ok(response.json::<GeminiResponse>().await?)
}

/// Sends the selfie with the consultant prompt and parses the JSON verdict.
pub async fn analyze_face(image: &ImagePayload) -> Result<FaceAnalysis> {
    let payload = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": ANALYZE_PROMPT }, inline_image_part(image)]
        }],
        "generationConfig": text_generation_config(),
        "safetySettings": build_safety_settings(),
    });

    let model = CONFIG.gemini_model.as_str();
    let metadata = json!({ "mimeType": image.mime_type, "bytes": image.bytes.len() });
    let analysis = log_llm_timing("gemini", model, "analyze_face", Some(metadata), || async {
        let response = call_gemini_api(model, payload).await?;
        let (text, _) = split_response(response);
        FaceAnalysis::from_model_text(&text).map_err(|err| {
            debug!(target: "llm.gemini", text = %truncate_for_log(&text, 4000));
            anyhow!(err)
        })
    })
    .await?;

    if analysis.recommendations.len() != EXPECTED_RECOMMENDATIONS {
        warn!(
            "Gemini returned {} recommendations (expected {})",
            analysis.recommendations.len(),
            EXPECTED_RECOMMENDATIONS
        );
    }
    info!(
        face_type = %analysis.face_type,
        recommendations = analysis.recommendations.len(),
        "Face analysis completed"
    );
    Ok(analysis)
}

async fn generate_edited_portrait(
    image: &ImagePayload,
    style_prompt: &str,
) -> Result<StyleGenerationOutput> {
    let payload = json!({
        "systemInstruction": { "parts": [{ "text": STYLE_EDIT_SYSTEM_PROMPT }] },
        "contents": [{
            "role": "user",
            "parts": [{ "text": style_edit_prompt(style_prompt) }, inline_image_part(image)]
        }],
        "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        "safetySettings": build_safety_settings(),
    });

    let model = CONFIG.gemini_image_model.as_str();
    let response = call_gemini_api(model, payload).await?;
    let (text, images) = split_response(response);
    let Some(first) = images.into_iter().next() else {
        return Err(anyhow!("No images returned by Gemini (model: {})", model));
    };

    Ok(StyleGenerationOutput {
        image_data_uri: data_uri(&first.mime_type, &first.bytes),
        text: Some(text).filter(|value| !value.trim().is_empty()),
    })
}

async fn describe_style(image: &ImagePayload, style_prompt: &str) -> Result<StyleGenerationOutput> {
    let payload = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": style_description_prompt(style_prompt) }, inline_image_part(image)]
        }],
        "generationConfig": text_generation_config(),
        "safetySettings": build_safety_settings(),
    });

    let response = call_gemini_api(&CONFIG.gemini_model, payload).await?;
    let (text, _) = split_response(response);
    Ok(StyleGenerationOutput {
        image_data_uri: image.to_data_uri(),
        text: Some(text).filter(|value| !value.trim().is_empty()),
    })
}

/// Produces the "after" image for one recommendation.
pub async fn generate_style(
    image: &ImagePayload,
    style_prompt: &str,
    style_name: &str,
) -> Result<StyleGenerationOutput> {
    let mode = CONFIG.style_generation_mode;
    let model = match mode {
        StyleGenerationMode::Image => CONFIG.gemini_image_model.as_str(),
        StyleGenerationMode::Describe => CONFIG.gemini_model.as_str(),
    };
    let metadata = json!({ "style": style_name, "mode": mode.as_str() });

    log_llm_timing("gemini", model, "generate_style", Some(metadata), || async {
        match mode {
            StyleGenerationMode::Image => generate_edited_portrait(image, style_prompt).await,
            StyleGenerationMode::Describe => describe_style(image, style_prompt).await,
        }
    })
    .await
}
