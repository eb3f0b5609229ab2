use axum::body::Bytes;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::comic::catalog::{DEFAULT_LANGUAGE, DEFAULT_STYLE};
use crate::comic::optimizer::optimize_prompt;
use crate::handlers::{parse_body, require_prompt, ApiError, ApiResult, CredentialFields};
use crate::llm::Provider;

pub const MISSING_KEYS: &str = "Either OpenAI API key or Google API key is required";

#[derive(Debug, Deserialize)]
struct OptimizeBody {
    #[serde(flatten)]
    credentials: CredentialFields,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default, alias = "style")]
    comic_style: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

pub async fn optimize(body: Bytes) -> ApiResult<Json<Value>> {
    let body: OptimizeBody = parse_body(&body)?;

    let credentials = body.credentials.into_credentials();
    if !credentials.has_any() {
        return Err(ApiError::BadRequest(MISSING_KEYS.to_string()));
    }
    let prompt = require_prompt(body.prompt)?;
    let style = body.comic_style.unwrap_or_else(|| DEFAULT_STYLE.to_string());
    let language = body.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let provider = Provider::select(&credentials)?;
    let optimized = optimize_prompt(&provider, &prompt, &style, &language).await?;

    Ok(Json(json!({
        "success": true,
        "optimized_prompt": optimized,
        "original_prompt": prompt,
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::MISSING_KEYS;
    use crate::handlers::test_support::post_json;

    #[tokio::test]
    async fn needs_some_key_then_a_prompt() {
        let (status, json) = post_json("/api/optimize-prompt", r#"{"prompt": "a cat"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], MISSING_KEYS);

        let (status, json) =
            post_json("/api/optimize-prompt", r#"{"google_api_key": "g", "prompt": ""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Prompt is required");
    }
}
