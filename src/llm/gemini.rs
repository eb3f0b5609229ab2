use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::CONFIG;
use crate::error::{ComicError, ComicResult};
use crate::llm::media::{detect_mime_type, fetch_reference_image};
use crate::llm::CompletionParams;
use crate::utils::http::get_http_client;
use crate::utils::text::{summarize_error_body, truncate_for_log};
use crate::utils::timing::log_llm_timing;

const IMAGE_SYSTEM_INSTRUCTION: &str =
    "Generate a comic image based on the prompt. CRITICAL: the response must be an image, NOT TEXT.";
const IMAGE_EDIT_SYSTEM_INSTRUCTION: &str = "Generate a comic image based on the prompt, using the provided images as references in the order given. CRITICAL: the response must be an image, NOT TEXT.";

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
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

/// Image bytes returned by the image model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

fn redact_api_key(text: &str, api_key: &str) -> String {
    let key = api_key.trim();
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

fn build_generation_config(params: CompletionParams, thinking_level: &str) -> Value {
    let mut config = Map::new();
    config.insert("temperature".to_string(), json!(params.temperature));
    if let Some(max_tokens) = params.gemini_max_output_tokens {
        config.insert("maxOutputTokens".to_string(), json!(max_tokens));
    }
    let thinking_level = thinking_level.trim();
    if !thinking_level.is_empty() {
        config.insert(
            "thinkingConfig".to_string(),
            json!({ "thinkingLevel": thinking_level }),
        );
    }
    Value::Object(config)
}

fn build_text_payload(
    system_prompt: &str,
    user_prompt: &str,
    params: CompletionParams,
    thinking_level: &str,
) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": system_prompt }] },
        "contents": [{ "role": "user", "parts": [{ "text": user_prompt }] }],
        "generationConfig": build_generation_config(params, thinking_level),
        "safetySettings": build_safety_settings(),
    })
}

fn build_image_parts(prompt: &str, images: &[Vec<u8>]) -> Vec<Value> {
    let mut parts = vec![json!({ "text": prompt })];
    for image in images {
        let mime_type = detect_mime_type(image).unwrap_or_else(|| "image/png".to_string());
        parts.push(json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": general_purpose::STANDARD.encode(image)
            }
        }));
    }
    parts
}

fn build_image_payload(prompt: &str, images: &[Vec<u8>]) -> Value {
    let system_instruction = if images.is_empty() {
        IMAGE_SYSTEM_INSTRUCTION
    } else {
        IMAGE_EDIT_SYSTEM_INSTRUCTION
    };
    json!({
        "systemInstruction": { "parts": [{ "text": system_instruction }] },
        "contents": [{ "role": "user", "parts": build_image_parts(prompt, images) }],
        "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        "safetySettings": build_safety_settings(),
    })
}

fn summarize_payload(payload: &Value) -> Value {
    let parts = payload
        .pointer("/contents/0/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .map(|part| {
                    if let Some(text) = part.get("text").and_then(Value::as_str) {
                        json!({ "text": truncate_for_log(text, 200) })
                    } else if let Some(inline_data) = part.get("inlineData") {
                        let mime_type = inline_data
                            .get("mimeType")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown");
                        let data_len = inline_data
                            .get("data")
                            .and_then(Value::as_str)
                            .map(str::len)
                            .unwrap_or(0);
                        json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
                    } else {
                        json!({ "unknownPart": true })
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    json!({
        "parts": parts,
        "generationConfig": payload.get("generationConfig").cloned().unwrap_or(Value::Null),
    })
}

fn extract_text_from_response(response: GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    for candidate in response.candidates.unwrap_or_default() {
        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default();
        for part in parts {
            if let GeminiPart::Text { text } = part {
                if !text.trim().is_empty() {
                    text_parts.push(text);
                }
            }
        }
    }
    text_parts.join("\n")
}

fn extract_first_image(response: GeminiResponse) -> Option<GeneratedImage> {
    for candidate in response.candidates.unwrap_or_default() {
        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default();
        for part in parts {
            let GeminiPart::InlineData { inline_data } = part else {
                continue;
            };
            if !inline_data.mime_type.starts_with("image/") {
                continue;
            }
            match general_purpose::STANDARD.decode(inline_data.data.as_bytes()) {
                Ok(bytes) if !bytes.is_empty() => {
                    return Some(GeneratedImage {
                        bytes,
                        mime_type: inline_data.mime_type,
                    })
                }
                Ok(_) => warn!("Gemini returned an empty inline image"),
                Err(err) => warn!("Gemini returned undecodable image data: {err}"),
            }
        }
    }
    None
}

async fn call_gemini_api(
    api_base: &str,
    api_key: &str,
    model: &str,
    payload: &Value,
    timeout: Duration,
) -> ComicResult<GeminiResponse> {
    let client = get_http_client();
    let url = format!("{}/models/{}:generateContent", api_base, model);

    if tracing::enabled!(tracing::Level::DEBUG) {
        debug!(target: "llm.gemini", model = model, payload = %summarize_payload(payload));
    }

    let response = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .timeout(timeout)
        .json(payload)
        .send()
        .await
        .map_err(|err| {
            let err_text = redact_api_key(&err.to_string(), api_key);
            warn!(
                "Gemini request failed to send: {} (timeout={}, connect={})",
                err_text,
                err.is_timeout(),
                err.is_connect()
            );
            ComicError::Provider(format!("Gemini request failed: {err_text}"))
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let (message, body_summary) = summarize_error_body(&body);
        warn!("Gemini API error: status={}, body={}", status, body_summary);
        let detail = redact_api_key(&message.unwrap_or(body_summary), api_key);
        return Err(ComicError::Provider(format!(
            "Gemini request failed with status {status}: {detail}"
        )));
    }

    response.json::<GeminiResponse>().await.map_err(|err| {
        ComicError::Provider(format!(
            "Gemini response could not be decoded: {}",
            redact_api_key(&err.to_string(), api_key)
        ))
    })
}

pub async fn generate_text(
    api_key: &str,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    params: CompletionParams,
    operation: &str,
) -> ComicResult<String> {
    generate_text_at(
        &CONFIG.gemini_api_base,
        api_key,
        model,
        system_prompt,
        user_prompt,
        params,
        operation,
    )
    .await
}

async fn generate_text_at(
    api_base: &str,
    api_key: &str,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    params: CompletionParams,
    operation: &str,
) -> ComicResult<String> {
    let payload = build_text_payload(
        system_prompt,
        user_prompt,
        params,
        &CONFIG.gemini_thinking_level,
    );
    let timeout = Duration::from_secs(CONFIG.llm_timeout_seconds);

    log_llm_timing("gemini", model, operation, None, || async {
        let response = call_gemini_api(api_base, api_key, model, &payload, timeout).await?;
        let text = extract_text_from_response(response);
        if text.trim().is_empty() {
            return Err(ComicError::Provider(
                "Gemini API returned empty response".to_string(),
            ));
        }
        Ok(text)
    })
    .await
}

/// Renders one image from a prompt plus ordered reference images.
///
/// Unreachable references are skipped. `Ok(None)` means the model answered
/// without an image.
pub async fn generate_image(
    api_key: &str,
    prompt: &str,
    reference_urls: &[String],
) -> ComicResult<Option<GeneratedImage>> {
    let mut images = Vec::new();
    for url in reference_urls {
        if let Some(data) = fetch_reference_image(url).await {
            images.push(data);
        }
    }
    if images.len() < reference_urls.len() {
        warn!(
            "Using {} of {} reference images for generation",
            images.len(),
            reference_urls.len()
        );
    }

    let payload = build_image_payload(prompt, &images);
    let model = CONFIG.gemini_image_model.as_str();
    let timeout = Duration::from_secs(CONFIG.image_timeout_seconds);
    let metadata = json!({ "references": images.len() });

    log_llm_timing("gemini", model, "generate_image", Some(metadata), || async {
        let response =
            call_gemini_api(&CONFIG.gemini_api_base, api_key, model, &payload, timeout).await?;
        Ok(extract_first_image(response))
    })
    .await
}
