use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleGenerationMode {
    /// Ask the image model for an edited portrait.
    Image,
    /// Return the original photo with a text description of the new style.
    Describe,
}

impl StyleGenerationMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            StyleGenerationMode::Image => "image",
            StyleGenerationMode::Describe => "describe",
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub bind_address: String,
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub gemini_image_model: String,
    pub gemini_temperature: f32,
    pub gemini_top_k: i32,
    pub gemini_top_p: f32,
    pub gemini_max_output_tokens: i32,
    pub gemini_safety_settings: String,
    pub gemini_timeout_seconds: u64,
    pub style_generation_mode: StyleGenerationMode,
    pub max_upload_bytes: usize,
    pub server_url: String,
    pub progress_tick_ms: u64,
    pub result_pacing_ms: u64,
    pub payment_delay_ms: u64,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn normalize_gemini_safety_settings(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "permissive".to_string();
    }

    let lowered = trimmed.to_lowercase();
    match lowered.as_str() {
        "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" => "standard".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to permissive.",
                value
            );
            "permissive".to_string()
        }
    }
}

fn parse_style_generation_mode(value: &str) -> StyleGenerationMode {
    match value.trim().to_lowercase().as_str() {
        "" | "image" | "edit" => StyleGenerationMode::Image,
        "describe" | "text" => StyleGenerationMode::Describe,
        other => {
            warn!(
                "Unknown STYLE_GENERATION_MODE value '{}'; defaulting to image.",
                other
            );
            StyleGenerationMode::Image
        }
    }
}

fn normalize_base_url(value: String) -> String {
    value.trim().trim_end_matches('/').to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        let max_upload_bytes = env_usize("MAX_UPLOAD_BYTES", 10 * 1024 * 1024);
        if max_upload_bytes == 0 {
            return Err(anyhow!("MAX_UPLOAD_BYTES must be greater than zero"));
        }

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            bind_address: env_string("BIND_ADDRESS", "0.0.0.0"),
            port: env_u16("PORT", 3000),
            gemini_api_key: env_string("GEMINI_API_KEY", ""),
            gemini_api_base: normalize_base_url(env_string(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com/v1beta",
            )),
            gemini_model: env_string("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
            gemini_temperature: env_f32("GEMINI_TEMPERATURE", 0.7),
            gemini_top_k: env_i32("GEMINI_TOP_K", 40),
            gemini_top_p: env_f32("GEMINI_TOP_P", 0.95),
            gemini_max_output_tokens: env_i32("GEMINI_MAX_OUTPUT_TOKENS", 4096),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            gemini_timeout_seconds: env_u64("GEMINI_TIMEOUT_SECONDS", 90),
            style_generation_mode: parse_style_generation_mode(&env_string(
                "STYLE_GENERATION_MODE",
                "image",
            )),
            max_upload_bytes,
            server_url: normalize_base_url(env_string(
                "FACESTYLE_SERVER_URL",
                "http://localhost:3000",
            )),
            progress_tick_ms: env_u64("PROGRESS_TICK_MS", 200).max(1),
            result_pacing_ms: env_u64("RESULT_PACING_MS", 500),
            payment_delay_ms: env_u64("PAYMENT_DELAY_MS", 1500),
        })
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }

    pub fn result_pacing(&self) -> Duration {
        Duration::from_millis(self.result_pacing_ms)
    }

    pub fn payment_delay(&self) -> Duration {
        Duration::from_millis(self.payment_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_mode_accepts_aliases() {
        assert_eq!(parse_style_generation_mode("Describe"), StyleGenerationMode::Describe);
        assert_eq!(parse_style_generation_mode(" text "), StyleGenerationMode::Describe);
        assert_eq!(parse_style_generation_mode(""), StyleGenerationMode::Image);
        assert_eq!(parse_style_generation_mode("bogus"), StyleGenerationMode::Image);
    }

    #[test]
    fn unknown_safety_profile_falls_back_to_permissive() {
        assert_eq!(
            normalize_gemini_safety_settings("STANDARD".to_string()),
            "standard"
        );
        assert_eq!(
            normalize_gemini_safety_settings("strictest".to_string()),
            "permissive"
        );
    }

    #[test]
    fn base_urls_lose_trailing_slashes() {
        assert_eq!(
            normalize_base_url(" http://localhost:3000/ ".to_string()),
            "http://localhost:3000"
        );
    }
}
