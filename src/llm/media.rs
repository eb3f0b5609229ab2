use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;
use tracing::warn;

use crate::config::CONFIG;
use crate::utils::http::get_http_client;
use crate::utils::text::truncate_for_log;

const MEDIA_DOWNLOAD_ERROR_BODY_LIMIT: usize = 800;

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(String),
    #[error("upstream returned status {0}")]
    Status(u16),
}

/// Splits a `data:<mime>;base64,<payload>` URL. Returns `None` for anything
/// else, including non-base64 data URLs.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    let bytes = general_purpose::STANDARD.decode(payload.trim()).ok()?;
    Some((mime_type.to_string(), bytes))
}

/// Encodes bytes as a base64 data URL.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// One GET with an explicit timeout. Non-2xx answers come back as
/// `FetchError::Status` so callers can pass the code on.
pub async fn fetch_media(url: &str, timeout: Duration) -> Result<FetchedMedia, FetchError> {
    let client = get_http_client();
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|err| {
            warn!(
                "Failed to fetch media {url}: {err} (timeout={}, connect={})",
                err.is_timeout(),
                err.is_connect()
            );
            FetchError::Transport(err.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(
            "Media download failed for {url} with status {}: {}",
            status,
            truncate_for_log(&body, MEDIA_DOWNLOAD_ERROR_BODY_LIMIT)
        );
        return Err(FetchError::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .bytes()
        .await
        .map_err(|err| FetchError::Transport(err.to_string()))?;

    Ok(FetchedMedia {
        bytes: bytes.to_vec(),
        content_type,
    })
}

/// Loads a reference image for the image model. Data URLs are decoded in
/// place; remote URLs get a single attempt. Failures are logged and skipped.
pub async fn fetch_reference_image(url: &str) -> Option<Vec<u8>> {
    let url = url.trim();
    if url.starts_with("data:") {
        let decoded = decode_data_url(url).map(|(_, bytes)| bytes);
        if decoded.is_none() {
            warn!("Skipping malformed data URL reference");
        }
        return decoded;
    }

    let timeout = Duration::from_secs(CONFIG.reference_fetch_timeout_seconds);
    match fetch_media(url, timeout).await {
        Ok(media) if !media.bytes.is_empty() => Some(media.bytes),
        Ok(_) => {
            warn!("Reference image {url} was empty");
            None
        }
        Err(err) => {
            warn!("Skipping reference image {url}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_round_trip() {
        let url = to_data_url("image/png", b"pixels");
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(
            decode_data_url(&url),
            Some(("image/png".to_string(), b"pixels".to_vec()))
        );
    }

    #[test]
    fn non_base64_data_url_is_rejected() {
        assert_eq!(decode_data_url("data:text/plain,hello"), None);
        assert_eq!(decode_data_url("https://example.com/a.png"), None);
    }

    #[test]
    fn png_signature_is_detected() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0, 0];
        assert_eq!(detect_mime_type(&png), Some("image/png".to_string()));
        assert_eq!(detect_mime_type(b"plain text"), None);
    }

    #[tokio::test]
    async fn malformed_data_reference_is_skipped() {
        assert_eq!(fetch_reference_image("data:image/png;base64,@@@").await, None);
    }
}
