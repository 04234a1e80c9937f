use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::error::TransformError;
use crate::types::TransformRequest;
use crate::TransformBackend;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-image-1";

/// Client for the OpenAI image-edit endpoint, the stage-2 transform.
///
/// The edit call is a single request: the only progress signal is the
/// sequence of descriptive messages handed to the caller's callback, never
/// a numeric percentage.
#[derive(Debug, Clone)]
pub struct OpenAiImageClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiImageClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Point the client at a different endpoint (e.g. a test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different image model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a custom `reqwest::Client`.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Edit the source image per the prompt. Returns a reference to the
    /// transformed image: the hosted URL when the service returns one, or a
    /// data URL built from the inline payload.
    pub async fn edit_image(
        &self,
        request: &TransformRequest,
        mut on_message: impl FnMut(&str),
    ) -> Result<String, TransformError> {
        on_message("Fetching source image...");
        let (bytes, mime_type) = self.resolve_source(&request.source_image).await?;

        on_message("Uploading image for transformation...");
        let part = Part::bytes(bytes)
            .file_name(source_filename(&mime_type))
            .mime_str(&mime_type)
            .map_err(|e| TransformError::SourceImage(format!("bad mime type: {}", e)))?;
        let form = Form::new()
            .part("image", part)
            .text("model", self.model.clone())
            .text("prompt", request.prompt.clone())
            .text("size", closest_size(request.width, request.height));

        let url = format!("{}/images/edits", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(180))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransformError::Network {
                context: format!("Cannot reach OpenAI at {}", self.base_url),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransformError::Http { status, body });
        }

        on_message("Reading transformed image...");
        let parsed: ImagesResponse = resp.json().await.map_err(|e| TransformError::Network {
            context: "Failed to parse OpenAI images response".into(),
            source: e,
        })?;
        result_reference(parsed)
    }

    /// Resolve a source reference into raw bytes: data URLs are decoded
    /// locally, anything else is fetched over HTTP.
    async fn resolve_source(&self, reference: &str) -> Result<(Vec<u8>, String), TransformError> {
        if let Some(rest) = reference.strip_prefix("data:") {
            return decode_data_url(rest);
        }

        let resp = self
            .http
            .get(reference)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| TransformError::Network {
                context: format!("Failed to download source image {}", reference),
                source: e,
            })?;

        if !resp.status().is_success() {
            return Err(TransformError::SourceImage(format!(
                "source fetch returned HTTP {}",
                resp.status().as_u16()
            )));
        }

        let mime_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| "image/png".to_string());

        let bytes = resp.bytes().await.map_err(|e| TransformError::Network {
            context: "Failed to read source image bytes".into(),
            source: e,
        })?;
        Ok((bytes.to_vec(), mime_type))
    }
}

impl TransformBackend for OpenAiImageClient {
    async fn transform(
        &self,
        request: &TransformRequest,
        on_message: impl FnMut(&str) + Send,
    ) -> Result<String, TransformError> {
        self.edit_image(request, on_message).await
    }
}

fn decode_data_url(rest: &str) -> Result<(Vec<u8>, String), TransformError> {
    // data:<mime>;base64,<payload>
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| TransformError::SourceImage("malformed data URL".into()))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| TransformError::SourceImage("data URL is not base64-encoded".into()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| TransformError::SourceImage(format!("base64 decode failed: {}", e)))?;
    let mime_type = if mime_type.is_empty() {
        "image/png".to_string()
    } else {
        mime_type.to_string()
    };
    Ok((bytes, mime_type))
}

fn source_filename(mime_type: &str) -> String {
    let extension = match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    };
    format!("source.{}", extension)
}

/// Map arbitrary target dimensions onto the nearest size the edit endpoint
/// accepts: square, landscape or portrait.
fn closest_size(width: u32, height: u32) -> String {
    if width > height {
        "1536x1024"
    } else if height > width {
        "1024x1536"
    } else {
        "1024x1024"
    }
    .to_string()
}

fn result_reference(parsed: ImagesResponse) -> Result<String, TransformError> {
    let entry = parsed
        .data
        .into_iter()
        .next()
        .ok_or_else(|| TransformError::InvalidResponse("Response contained no images".into()))?;
    match (entry.url, entry.b64_json) {
        (Some(url), _) => Ok(url),
        (None, Some(b64)) => Ok(format!("data:image/png;base64,{}", b64)),
        (None, None) => Err(TransformError::InvalidResponse(
            "Image entry had neither url nor b64_json".into(),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageEntry>,
}

#[derive(Debug, Deserialize)]
struct ImageEntry {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}
