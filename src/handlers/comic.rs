use axum::body::Bytes;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::comic::catalog::{DEFAULT_LANGUAGE, DEFAULT_STYLE};
use crate::comic::script::{
    generate_script, ScriptRequest, DEFAULT_PAGE_COUNT, DEFAULT_ROWS_PER_PAGE, MAX_PAGE_COUNT,
    MAX_ROWS_PER_PAGE, MIN_PAGE_COUNT, MIN_ROWS_PER_PAGE,
};
use crate::comic::validate::validate_script;
use crate::handlers::{int_in_range, parse_body, require_prompt, ApiError, ApiResult, CredentialFields};
use crate::llm::Provider;

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(flatten)]
    credentials: CredentialFields,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default, alias = "style")]
    comic_style: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    page_count: Option<Value>,
    #[serde(default)]
    rows_per_page: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ValidateBody {
    #[serde(default)]
    script: Value,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Comic generator API is running" }))
}

pub async fn generate(body: Bytes) -> ApiResult<Json<Value>> {
    let body: GenerateBody = parse_body(&body)?;

    let credentials = body.credentials.into_credentials();
    if !credentials.has_any() {
        return Err(ApiError::BadRequest("API key is required".to_string()));
    }
    let prompt = require_prompt(body.prompt)?;

    let page_count = int_in_range(
        body.page_count.as_ref(),
        Some(DEFAULT_PAGE_COUNT),
        MIN_PAGE_COUNT,
        MAX_PAGE_COUNT,
        "Page count must be between 1 and 10",
    )?
    .unwrap_or(DEFAULT_PAGE_COUNT);
    let rows_per_page = int_in_range(
        body.rows_per_page.as_ref(),
        Some(DEFAULT_ROWS_PER_PAGE),
        MIN_ROWS_PER_PAGE,
        MAX_ROWS_PER_PAGE,
        "Rows per page must be between 1 and 5",
    )?
    .unwrap_or(DEFAULT_ROWS_PER_PAGE);

    let request = ScriptRequest {
        prompt,
        style: body.comic_style.unwrap_or_else(|| DEFAULT_STYLE.to_string()),
        language: body.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        page_count,
        rows_per_page,
    };
    let provider = Provider::select(&credentials)?;
    let pages = generate_script(&provider, &request).await?;

    Ok(Json(json!({
        "success": true,
        "page_count": pages.len(),
        "pages": pages,
    })))
}

/// Always answers 200; problems are reported in the body.
pub async fn validate(body: Bytes) -> Json<Value> {
    let script = serde_json::from_slice::<ValidateBody>(&body)
        .map(|body| body.script)
        .unwrap_or(Value::Null);

    match validate_script(&script) {
        Ok(()) => Json(json!({ "valid": true })),
        Err(reason) => Json(json!({ "valid": false, "error": reason })),
    }
}
