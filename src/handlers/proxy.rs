use std::time::Duration;

use axum::extract::Query;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::config::CONFIG;
use crate::handlers::{ApiError, ApiResult};
use crate::llm::media::{fetch_media, FetchError};

const DEFAULT_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    url: Option<String>,
}

fn parse_image_url(raw: Option<String>) -> ApiResult<Url> {
    let raw = raw
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Image URL is required".to_string()))?;
    let url = Url::parse(raw.trim())
        .map_err(|err| ApiError::BadRequest(format!("Invalid image URL: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ApiError::BadRequest(format!(
            "Unsupported image URL scheme: {scheme}"
        ))),
    }
}

fn download_file_name() -> String {
    let nanos = Utc::now().timestamp_subsec_nanos();
    format!("comic-{nanos:08x}.png")
}

/// Re-serves a remote image from this origin so the browser can save it.
pub async fn proxy_image(Query(query): Query<ProxyQuery>) -> ApiResult<Response> {
    let url = parse_image_url(query.url)?;
    let timeout = Duration::from_secs(CONFIG.proxy_timeout_seconds);

    let media = fetch_media(url.as_str(), timeout).await.map_err(|err| match err {
        FetchError::Status(code) => ApiError::Upstream(
            StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
            format!("Failed to fetch image: {code}"),
        ),
        FetchError::Transport(message) => ApiError::Upstream(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to fetch image: {message}"),
        ),
    })?;

    info!("Proxied {} bytes from {}", media.bytes.len(), url.host_str().unwrap_or("?"));
    let content_type = media
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let disposition = format!("attachment; filename={}", download_file_name());

    Ok((
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, disposition),
        ],
        media.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    use crate::handlers::test_support::{body_json, send};

    #[test]
    fn only_web_urls_are_fetched() {
        assert!(parse_image_url(Some("https://cdn.example.com/a.png".into())).is_ok());
        assert!(parse_image_url(Some("file:///etc/passwd".into())).is_err());
        assert!(parse_image_url(Some("not a url".into())).is_err());
        assert_eq!(
            parse_image_url(None).unwrap_err().to_string(),
            "Image URL is required"
        );
    }

    #[test]
    fn download_names_look_like_comic_pngs() {
        let name = download_file_name();
        assert!(name.starts_with("comic-"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "comic-".len() + 8 + ".png".len());
    }

    #[tokio::test]
    async fn missing_url_is_a_bad_request() {
        let request = Request::builder()
            .uri("/api/proxy-image")
            .body(Body::empty())
            .unwrap();
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Image URL is required");
    }
}
