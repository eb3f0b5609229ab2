use std::env;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub gemini_api_base: String,
    pub gemini_text_model: String,
    pub gemini_image_model: String,
    pub gemini_thinking_level: String,
    pub gemini_safety_settings: String,
    pub llm_timeout_seconds: u64,
    pub image_timeout_seconds: u64,
    pub reference_fetch_timeout_seconds: u64,
    pub proxy_timeout_seconds: u64,
    pub image_upload_timeout_seconds: u64,
    pub image_host_api_key: String,
    pub image_host_endpoint: String,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

/// Logging knobs, read on their own so the subscriber can be installed
/// before `CONFIG` is built and its warnings have somewhere to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub dir: String,
}

impl LogSettings {
    pub fn from_env() -> Self {
        LogSettings {
            level: env_string("LOG_LEVEL", "info").to_lowercase(),
            dir: env_string("LOG_DIR", "logs"),
        }
    }
}

fn normalize_base_url(value: String) -> String {
    value.trim().trim_end_matches('/').to_string()
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

impl Config {
    pub fn load() -> Result<Self> {
        let port = env_u16("PORT", 5003);
        if port == 0 {
            return Err(anyhow!("PORT must be a non-zero port number"));
        }

        let log = LogSettings::from_env();
        Ok(Config {
            host: env_string("HOST", "0.0.0.0"),
            port,
            log_level: log.level,
            log_dir: log.dir,
            openai_base_url: normalize_base_url(env_string(
                "OPENAI_BASE_URL",
                "https://api.openai.com/v1",
            )),
            openai_model: env_string("OPENAI_MODEL", "gpt-4o-mini"),
            gemini_api_base: normalize_base_url(env_string(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com/v1beta",
            )),
            gemini_text_model: env_string("GEMINI_TEXT_MODEL", "gemini-3-flash-preview"),
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-3-pro-image-preview"),
            gemini_thinking_level: env_string("GEMINI_THINKING_LEVEL", "low")
                .trim()
                .to_lowercase(),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            llm_timeout_seconds: env_u64("LLM_TIMEOUT_SECONDS", 90).max(1),
            image_timeout_seconds: env_u64("IMAGE_TIMEOUT_SECONDS", 180).max(1),
            reference_fetch_timeout_seconds: env_u64("REFERENCE_FETCH_TIMEOUT_SECONDS", 30)
                .max(1),
            proxy_timeout_seconds: env_u64("PROXY_TIMEOUT_SECONDS", 60).max(1),
            image_upload_timeout_seconds: env_u64("IMAGE_UPLOAD_TIMEOUT_SECONDS", 60).max(1),
            image_host_api_key: env_string("IMAGE_HOST_API_KEY", ""),
            image_host_endpoint: env_string(
                "IMAGE_HOST_ENDPOINT",
                "https://cwd.pw/api/upload-image",
            ),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
