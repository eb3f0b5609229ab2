use axum::body::Bytes;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::comic::catalog::{DEFAULT_IMAGE_LANGUAGE, DEFAULT_STYLE};
use crate::comic::image_prompt::{self, ordered_references, reference_urls, RenderedImage};
use crate::comic::script::{MAX_ROWS_PER_PAGE, MIN_ROWS_PER_PAGE};
use crate::comic::{pages_from_value, Page};
use crate::error::ComicError;
use crate::handlers::{int_in_range, is_blank_value, parse_body, ApiError, ApiResult};
use crate::utils::text::non_blank;

#[derive(Debug, Deserialize)]
struct PageImageBody {
    #[serde(default)]
    page_data: Option<Value>,
    #[serde(default)]
    google_api_key: Option<String>,
    #[serde(default, alias = "style")]
    comic_style: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    reference_img: Option<Value>,
    #[serde(default)]
    extra_body: Option<Value>,
    #[serde(default, alias = "rows_limit")]
    rows_per_page: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CoverBody {
    #[serde(default)]
    google_api_key: Option<String>,
    #[serde(default, alias = "style")]
    comic_style: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    reference_imgs: Option<Value>,
    #[serde(default)]
    custom_requirements: Option<String>,
}

fn require_google_key(key: Option<String>) -> ApiResult<String> {
    non_blank(key).ok_or_else(|| ApiError::BadRequest("Google API key is required".to_string()))
}

/// The page to draw. A list is accepted and its first page used.
fn page_from_request(page_data: Value) -> ApiResult<Page> {
    let pages = pages_from_value(page_data).map_err(|err| match err {
        ComicError::Validation(reason) | ComicError::MalformedResponse(reason) => {
            ApiError::BadRequest(reason)
        }
        other => ApiError::Comic(other),
    })?;
    pages
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("Page data is required".to_string()))
}

fn rendered_json(rendered: RenderedImage) -> Json<Value> {
    Json(json!({
        "success": true,
        "image_url": rendered.image_url,
        "prompt": rendered.prompt,
    }))
}

pub async fn generate_image(body: Bytes) -> ApiResult<Json<Value>> {
    let body: PageImageBody = parse_body(&body)?;

    if is_blank_value(body.page_data.as_ref()) {
        return Err(ApiError::BadRequest("Page data is required".to_string()));
    }
    let google_api_key = require_google_key(body.google_api_key)?;
    let rows_limit = int_in_range(
        body.rows_per_page.as_ref(),
        None,
        MIN_ROWS_PER_PAGE,
        MAX_ROWS_PER_PAGE,
        "Rows per page must be between 1 and 5",
    )?;
    let page = page_from_request(body.page_data.unwrap_or(Value::Null))?;

    let references = ordered_references(
        reference_urls(body.extra_body.as_ref()),
        reference_urls(body.reference_img.as_ref()),
    );
    let style = body.comic_style.unwrap_or_else(|| DEFAULT_STYLE.to_string());
    let language = body
        .language
        .unwrap_or_else(|| DEFAULT_IMAGE_LANGUAGE.to_string());

    let rendered = image_prompt::generate_page_image(
        &google_api_key,
        &page,
        &style,
        &language,
        rows_limit.map(|limit| limit as usize),
        &references,
    )
    .await?;
    Ok(rendered_json(rendered))
}

pub async fn generate_cover(body: Bytes) -> ApiResult<Json<Value>> {
    let body: CoverBody = parse_body(&body)?;

    let google_api_key = require_google_key(body.google_api_key)?;
    let references = reference_urls(body.reference_imgs.as_ref());
    let style = body.comic_style.unwrap_or_else(|| DEFAULT_STYLE.to_string());
    let language = body
        .language
        .unwrap_or_else(|| DEFAULT_IMAGE_LANGUAGE.to_string());

    let rendered = image_prompt::generate_cover(
        &google_api_key,
        &style,
        &language,
        &references,
        body.custom_requirements.as_deref(),
    )
    .await?;
    Ok(rendered_json(rendered))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::page_from_request;
    use crate::handlers::test_support::post_json;

    #[tokio::test]
    async fn page_data_is_checked_first() {
        let (status, json) =
            post_json("/api/generate-image", r#"{"google_api_key": "g", "page_data": {}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Page data is required");
    }

    #[tokio::test]
    async fn image_routes_need_a_google_key() {
        let (status, json) = post_json(
            "/api/generate-image",
            r#"{"api_key": "sk", "page_data": {"rows": []}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Google API key is required");

        let (status, json) =
            post_json("/api/generate-cover", r#"{"google_api_key": " ", "comic_style": "pixar"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Google API key is required");
    }

    #[tokio::test]
    async fn rows_limit_alias_is_range_checked() {
        let (status, json) = post_json(
            "/api/generate-image",
            r#"{"google_api_key": "g", "page_data": {"rows": []}, "rows_limit": 9}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Rows per page must be between 1 and 5");
    }

    #[tokio::test]
    async fn malformed_page_is_a_client_error() {
        let (status, json) = post_json(
            "/api/generate-image",
            r#"{"google_api_key": "g", "page_data": {"rows": "none"}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("rows must be a list"));
    }

    #[test]
    fn loosely_typed_page_is_drawable() {
        let page = page_from_request(json!({
            "title": null,
            "rows": [{ "height": 180, "panels": [{ "text": 42 }, { "text": "Boom" }] }]
        }))
        .unwrap();
        assert_eq!(page.title, "");
        assert_eq!(page.panel_texts(), vec!["42", "Boom"]);
    }
}
