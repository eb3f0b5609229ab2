use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::CONFIG;
use crate::error::{ComicError, ComicResult};
use crate::llm::CompletionParams;
use crate::utils::http::get_http_client;
use crate::utils::text::{summarize_error_body, truncate_for_log};
use crate::utils::timing::log_llm_timing;

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*<think>(.*?)</think>(.*)$").expect("think block regex is valid")
});

fn summarize_payload(payload: &Value) -> String {
    let model = payload
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let message_count = payload
        .get("messages")
        .and_then(|v| v.as_array())
        .map(|messages| messages.len())
        .unwrap_or(0);
    let user_preview = payload
        .pointer("/messages/1/content")
        .and_then(|v| v.as_str())
        .map(|text| truncate_for_log(text, 200))
        .unwrap_or_default();

    format!(
        "model={}, messages={}, temperature={}, max_tokens={}, user={:?}",
        model,
        message_count,
        payload.get("temperature").cloned().unwrap_or(Value::Null),
        payload.get("max_tokens").cloned().unwrap_or(Value::Null),
        user_preview
    )
}

fn build_payload(
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    params: CompletionParams,
) -> Value {
    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(model));
    payload.insert(
        "messages".to_string(),
        json!([
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_prompt }
        ]),
    );
    payload.insert("temperature".to_string(), json!(params.temperature));
    if let Some(max_tokens) = params.openai_max_tokens {
        payload.insert("max_tokens".to_string(), json!(max_tokens));
    }
    Value::Object(payload)
}

/// Drops a leading `<think>...</think>` block some reasoning models emit.
/// When nothing follows the block the reasoning itself is kept.
fn strip_think_block(content: &str) -> String {
    if let Some(caps) = THINK_BLOCK.captures(content) {
        let final_text = caps.get(2).map(|m| m.as_str()).unwrap_or("").trim();
        if !final_text.is_empty() {
            return final_text.to_string();
        }
        let analysis = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        return analysis.trim().to_string();
    }
    content.trim().to_string()
}

fn extract_reasoning_text(message: &Value) -> Option<String> {
    for key in ["reasoning", "reasoning_content"] {
        if let Some(reasoning) = message.get(key).and_then(|v| v.as_str()) {
            let trimmed = reasoning.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn extract_message_content(response: &Value) -> String {
    let message = response
        .get("choices")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("message"))
        .cloned()
        .unwrap_or(Value::Null);

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .map(strip_think_block)
        .unwrap_or_default();
    if !content.is_empty() {
        return content;
    }

    extract_reasoning_text(&message).unwrap_or_default()
}

async fn call_chat_completions(api_key: &str, base_url: &str, payload: &Value) -> ComicResult<Value> {
    debug!("OpenAI request: {}", summarize_payload(payload));

    let client = get_http_client();
    let response = client
        .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
        .bearer_auth(api_key)
        .timeout(Duration::from_secs(CONFIG.llm_timeout_seconds))
        .json(payload)
        .send()
        .await
        .map_err(|err| ComicError::Provider(format!("OpenAI request failed: {err}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let (message, body_summary) = summarize_error_body(&body);
        warn!("OpenAI API error: status={}, body={}", status, body_summary);
        let detail = message.unwrap_or(body_summary);
        return Err(ComicError::Provider(format!(
            "OpenAI request failed with status {status}: {detail}"
        )));
    }

    let value = response
        .json::<Value>()
        .await
        .map_err(|err| ComicError::Provider(format!("OpenAI response could not be decoded: {err}")))?;
    debug!(
        "OpenAI response received for model={}",
        payload
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    );
    Ok(value)
}

pub async fn generate_text(
    api_key: &str,
    base_url: &str,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    params: CompletionParams,
    operation: &str,
) -> ComicResult<String> {
    let payload = build_payload(model, system_prompt, user_prompt, params);

    log_llm_timing("openai", model, operation, None, || async {
        let response = call_chat_completions(api_key, base_url, &payload).await?;
        let content = extract_message_content(&response);
        if content.is_empty() {
            warn!(
                "OpenAI response had empty content: {}",
                truncate_for_log(&response.to_string(), 2000)
            );
            return Err(ComicError::Provider(
                "OpenAI API returned empty response".to_string(),
            ));
        }
        Ok(content)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    use crate::handlers::test_support::{chat_stub, serve_stub};

    const PARAMS: CompletionParams = CompletionParams {
        temperature: 0.7,
        openai_max_tokens: Some(100),
        gemini_max_output_tokens: None,
    };

    async fn failing_stub(status: StatusCode, body: Value) -> String {
        let router = Router::new().route(
            "/chat/completions",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        serve_stub(router).await
    }

    #[test]
    fn payload_carries_token_limit_only_when_set() {
        let params = CompletionParams {
            temperature: 0.8,
            openai_max_tokens: Some(1000),
            gemini_max_output_tokens: None,
        };
        let payload = build_payload("gpt-4o-mini", "sys", "user", params);
        assert_eq!(payload["max_tokens"], json!(1000));
        assert_eq!(payload["messages"][0]["role"], json!("system"));
        assert_eq!(payload["messages"][1]["content"], json!("user"));

        let unbounded = build_payload(
            "gpt-4o-mini",
            "sys",
            "user",
            CompletionParams {
                openai_max_tokens: None,
                ..params
            },
        );
        assert!(unbounded.get("max_tokens").is_none());
    }

    #[test]
    fn think_block_is_removed() {
        assert_eq!(
            strip_think_block("<think>\nplan the pages\n</think>\n[{\"rows\": []}]"),
            "[{\"rows\": []}]"
        );
        assert_eq!(strip_think_block("<think>only thoughts</think>  "), "only thoughts");
        assert_eq!(strip_think_block("  plain  "), "plain");
    }

    #[test]
    fn content_falls_back_to_reasoning() {
        let response = json!({
            "choices": [{ "message": { "content": "", "reasoning_content": "Title" } }]
        });
        assert_eq!(extract_message_content(&response), "Title");
    }

    #[test]
    fn missing_choices_give_empty_content() {
        assert_eq!(extract_message_content(&json!({ "choices": [] })), "");
    }

    #[tokio::test]
    async fn error_status_surfaces_the_provider_message() {
        let base_url = failing_stub(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": { "message": "model is overloaded" } }),
        )
        .await;
        let err = generate_text("sk", &base_url, "m", "sys", "user", PARAMS, "test")
            .await
            .unwrap_err();
        let ComicError::Provider(message) = &err else {
            panic!("expected a provider error, got {err:?}");
        };
        assert!(message.contains("500"), "{message}");
        assert!(message.contains("model is overloaded"), "{message}");
    }

    #[tokio::test]
    async fn empty_content_is_a_provider_error() {
        let (base_url, _) = chat_stub("").await;
        let err = generate_text("sk", &base_url, "m", "sys", "user", PARAMS, "test")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ComicError::Provider("OpenAI API returned empty response".to_string())
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_provider_error() {
        let err = generate_text("sk", "http://127.0.0.1:1", "m", "sys", "user", PARAMS, "test")
            .await
            .unwrap_err();
        assert!(
            matches!(&err, ComicError::Provider(message) if message.starts_with("OpenAI request failed")),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn reply_is_returned_without_think_block() {
        let (base_url, seen) = chat_stub("<think>draft</think>\nFinal answer").await;
        let text = generate_text("sk-test", &format!("{base_url}/"), "story-model", "sys", "user", PARAMS, "test")
            .await
            .unwrap();
        assert_eq!(text, "Final answer");

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["model"], "story-model");
        assert_eq!(requests[0]["max_tokens"], 100);
        assert_eq!(requests[0]["messages"][0]["content"], "sys");
    }
}
