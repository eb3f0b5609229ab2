use axum::body::Bytes;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::comic::pages_from_comic_data;
use crate::comic::social::{generate_social_content, Platform};
use crate::handlers::{is_blank_value, parse_body, ApiError, ApiResult, CredentialFields};
use crate::llm::Provider;

#[derive(Debug, Deserialize)]
struct SocialBody {
    #[serde(flatten)]
    credentials: CredentialFields,
    #[serde(default)]
    comic_data: Option<Value>,
    #[serde(default)]
    platform: Option<String>,
}

/// Social copy always runs on the OpenAI-compatible backend.
pub async fn generate(body: Bytes) -> ApiResult<Json<Value>> {
    let body: SocialBody = parse_body(&body)?;

    let credentials = body.credentials.into_credentials();
    if credentials.openai_key.is_none() {
        return Err(ApiError::BadRequest("API key is required".to_string()));
    }
    if is_blank_value(body.comic_data.as_ref()) {
        return Err(ApiError::BadRequest("Comic data is required".to_string()));
    }
    let pages = body
        .comic_data
        .as_ref()
        .map(pages_from_comic_data)
        .unwrap_or_default();
    let platform = Platform::parse(body.platform.as_deref());

    let provider = Provider::openai_only(&credentials)?;
    let post = generate_social_content(&provider, &pages, platform).await?;

    Ok(Json(json!({
        "success": true,
        "title": post.title,
        "content": post.content,
        "tags": post.tags,
        "platform": post.platform,
    })))
}
