use axum::body::Bytes;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::comic::catalog::DEFAULT_LANGUAGE;
use crate::comic::pages_from_comic_data;
use crate::comic::title::generate_title as build_title;
use crate::handlers::prompt::MISSING_KEYS;
use crate::handlers::{parse_body, require_prompt, ApiError, ApiResult, CredentialFields};
use crate::llm::Provider;

#[derive(Debug, Deserialize)]
struct TitleBody {
    #[serde(flatten)]
    credentials: CredentialFields,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    comic_data: Option<Value>,
}

pub async fn generate_title(body: Bytes) -> ApiResult<Json<Value>> {
    let body: TitleBody = parse_body(&body)?;

    let credentials = body.credentials.into_credentials();
    if !credentials.has_any() {
        return Err(ApiError::BadRequest(MISSING_KEYS.to_string()));
    }
    let prompt = require_prompt(body.prompt)?;
    let language = body.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let pages = body
        .comic_data
        .as_ref()
        .map(pages_from_comic_data)
        .unwrap_or_default();

    let provider = Provider::select(&credentials)?;
    let title = build_title(&provider, &prompt, &language, pages.first()).await?;

    Ok(Json(json!({
        "success": true,
        "title": title,
        "original_prompt": prompt,
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::handlers::prompt::MISSING_KEYS;
    use serde_json::json;

    use crate::handlers::test_support::{chat_stub, post_json};

    #[tokio::test]
    async fn rejects_missing_keys_and_blank_prompt() {
        let (status, json) = post_json(
            "/api/generate-session-title",
            r#"{"prompt": "dragon", "api_key": "  "}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], MISSING_KEYS);

        let (_, json) = post_json(
            "/api/generate-session-title",
            r#"{"api_key": "sk", "prompt": "\n\t"}"#,
        )
        .await;
        assert_eq!(json["error"], "Prompt cannot be empty");
    }

    #[tokio::test]
    async fn title_is_cleaned_and_returned() {
        let (base_url, seen) = chat_stub("「雨夜等猫」").await;
        let body = json!({
            "api_key": "sk",
            "base_url": base_url,
            "prompt": "下雨天的猫",
            "comic_data": { "pages": [{ "title": "开端", "rows": [{ "panels": [{ "text": 7 }] }] }] },
        });
        let (status, json) = post_json("/api/generate-session-title", &body.to_string()).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["title"], "雨夜等猫");
        assert_eq!(json["original_prompt"], "下雨天的猫");

        let requests = seen.lock().unwrap();
        let user_prompt = requests[0]["messages"][1]["content"].as_str().unwrap();
        assert!(user_prompt.contains("生成的第一页标题: 开端"), "{user_prompt}");
    }
}
