use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::CONFIG;
use crate::llm::gemini::GeneratedImage;
use crate::llm::media::to_data_url;
use crate::utils::http::get_http_client;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

fn upload_file_name(mime_type: &str) -> String {
    let file_ext = mime_type.split('/').nth(1).unwrap_or("png");
    format!("comic.{}", if file_ext == "jpeg" { "jpg" } else { file_ext })
}

async fn upload_image_bytes(
    endpoint: &str,
    timeout: Duration,
    image_bytes: &[u8],
    api_key: &str,
    mime_type: &str,
    model: &str,
    prompt: &str,
) -> Option<String> {
    let image_part = Part::bytes(image_bytes.to_vec())
        .file_name(upload_file_name(mime_type))
        .mime_str(mime_type)
        .ok()?;

    let form = Form::new()
        .part("image", image_part)
        .text("api_key", api_key.to_string())
        .text("ai_generated", "true")
        .text("model", model.to_string())
        .text("prompt", prompt.to_string());

    let client = get_http_client();
    let response = match client
        .post(endpoint)
        .timeout(timeout)
        .multipart(form)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!("Image upload request failed: {err}");
            return None;
        }
    };

    if !response.status().is_success() {
        warn!("Image upload failed with status {}", response.status());
        return None;
    }

    let parsed = response.json::<UploadResponse>().await.ok()?;
    if parsed.success {
        if let Some(url) = parsed.image_url {
            info!("Uploaded comic image: {}", url);
            return Some(url);
        }
    }

    None
}

/// Turns a generated image into a URL the frontend can display.
///
/// Uploads to the configured host when `IMAGE_HOST_API_KEY` is set; otherwise,
/// or when the upload fails, the image is returned inline as a data URL.
pub async fn publish_image(image: &GeneratedImage, prompt: &str) -> String {
    let api_key = CONFIG.image_host_api_key.trim();
    if !api_key.is_empty() {
        if let Some(url) = upload_image_bytes(
            &CONFIG.image_host_endpoint,
            Duration::from_secs(CONFIG.image_upload_timeout_seconds),
            &image.bytes,
            api_key,
            &image.mime_type,
            &CONFIG.gemini_image_model,
            prompt,
        )
        .await
        {
            return url;
        }
        warn!("Falling back to an inline data URL for the generated image");
    }
    to_data_url(&image.mime_type, &image.bytes)
}
