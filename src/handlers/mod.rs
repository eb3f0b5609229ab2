pub mod comic;
pub mod image;
pub mod prompt;
pub mod proxy;
pub mod session;
pub mod social;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ComicError;
use crate::llm::Credentials;

pub const NO_JSON_DATA: &str = "No JSON data provided";

/// Failures as seen by HTTP callers. Always rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Comic(#[from] ComicError),
    #[error("{1}")]
    Upstream(StatusCode, String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Comic(ComicError::Config(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Comic(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(status, _) => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", message);
        } else {
            info!(status = status.as_u16(), "Request rejected: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Parses a request body into `T`. Missing, non-JSON, null or empty-object
/// bodies all count as "no data".
pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::BadRequest(NO_JSON_DATA.to_string()))?;
    match &value {
        Value::Object(map) if !map.is_empty() => {}
        _ => return Err(ApiError::BadRequest(NO_JSON_DATA.to_string())),
    }
    serde_json::from_value(value)
        .map_err(|err| ApiError::BadRequest(format!("Invalid request: {err}")))
}

/// Reads an optional integer field, rejecting non-integers and values
/// outside `min..=max` with `message`.
pub fn int_in_range(
    value: Option<&Value>,
    default: Option<u32>,
    min: u32,
    max: u32,
    message: &str,
) -> ApiResult<Option<u32>> {
    let value = match value {
        None | Some(Value::Null) => return Ok(default),
        Some(value) => value,
    };
    match value.as_u64() {
        Some(number) if number >= u64::from(min) && number <= u64::from(max) => {
            Ok(Some(number as u32))
        }
        _ => Err(ApiError::BadRequest(message.to_string())),
    }
}

/// A prompt must be present and not just whitespace.
pub fn require_prompt(prompt: Option<String>) -> ApiResult<String> {
    match prompt {
        None => Err(ApiError::BadRequest("Prompt is required".to_string())),
        Some(prompt) if prompt.is_empty() => {
            Err(ApiError::BadRequest("Prompt is required".to_string()))
        }
        Some(prompt) if prompt.trim().is_empty() => {
            Err(ApiError::BadRequest("Prompt cannot be empty".to_string()))
        }
        Some(prompt) => Ok(prompt),
    }
}

/// Provider credential fields shared by the text-generation routes.
#[derive(Debug, Default, serde::Deserialize)]
pub struct CredentialFields {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl CredentialFields {
    pub fn into_credentials(self) -> Credentials {
        Credentials::new(self.api_key, self.base_url, self.model, self.google_api_key)
    }
}

/// Python-style emptiness: null, false, 0, "", [] and {} are all missing.
pub fn is_blank_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(flag)) => !flag,
        Some(Value::Number(number)) => number.as_f64() == Some(0.0),
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
    }
}

pub fn build_router() -> Router {
    Router::new()
        .route("/api/health", get(comic::health))
        .route("/api/generate", post(comic::generate))
        .route("/api/validate", post(comic::validate))
        .route("/api/generate-image", post(image::generate_image))
        .route("/api/generate-cover", post(image::generate_cover))
        .route("/api/optimize-prompt", post(prompt::optimize))
        .route("/api/generate-session-title", post(session::generate_title))
        .route("/api/generate-xiaohongshu", post(social::generate))
        .route("/api/proxy-image", get(proxy::proxy_image))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use axum::routing::post;
    use axum::{Json, Router};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    use super::build_router;

    /// Serves `router` on an ephemeral loopback port and returns its base URL.
    pub async fn serve_stub(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// An OpenAI-compatible backend that answers every chat completion with
    /// `content` and records the request bodies it saw.
    pub async fn chat_stub(content: &str) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reply = json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] });
        let recorder = seen.clone();
        let router = Router::new().route(
            "/chat/completions",
            post(move |Json(request): Json<Value>| {
                let reply = reply.clone();
                let recorder = recorder.clone();
                async move {
                    recorder.lock().unwrap().push(request);
                    Json(reply)
                }
            }),
        );
        (serve_stub(router).await, seen)
    }

    pub async fn send(request: Request<Body>) -> Response {
        build_router().oneshot(request).await.unwrap()
    }

    pub async fn post_json(uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::post_json;
    use super::*;

    #[test]
    fn config_errors_are_client_errors() {
        assert_eq!(
            ApiError::Comic(ComicError::Config("no credential".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Comic(ComicError::Validation("bad".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Upstream(StatusCode::NOT_FOUND, "gone".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn integer_fields_are_range_checked() {
        let msg = "Page count must be between 1 and 10";
        assert_eq!(int_in_range(None, Some(3), 1, 10, msg).unwrap(), Some(3));
        assert_eq!(int_in_range(Some(&json!(10)), Some(3), 1, 10, msg).unwrap(), Some(10));
        for bad in [json!(0), json!(11), json!(-1), json!(2.5), json!("3"), json!(true)] {
            assert!(int_in_range(Some(&bad), Some(3), 1, 10, msg).is_err(), "{bad}");
        }
    }

    #[test]
    fn prompt_presence_and_blankness_differ() {
        assert_eq!(
            require_prompt(None).unwrap_err().to_string(),
            "Prompt is required"
        );
        assert_eq!(
            require_prompt(Some("   ".into())).unwrap_err().to_string(),
            "Prompt cannot be empty"
        );
        assert_eq!(require_prompt(Some("cat".into())).unwrap(), "cat");
    }

    #[tokio::test]
    async fn non_json_body_is_rejected_everywhere() {
        for uri in [
            "/api/generate",
            "/api/generate-image",
            "/api/generate-cover",
            "/api/optimize-prompt",
            "/api/generate-session-title",
            "/api/generate-xiaohongshu",
        ] {
            for body in ["", "not json", "null", "{}"] {
                let (status, json) = post_json(uri, body).await;
                assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body:?}");
                assert_eq!(json["error"], NO_JSON_DATA, "{uri} {body:?}");
            }
        }
    }
}
