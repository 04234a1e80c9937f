use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, PollError};
use crate::poll::{self, PollState, PollStatus};
use crate::types::GenerationRequest;
use crate::GenerationBackend;

const DEFAULT_BASE_URL: &str = "https://api.letz.ai";
const SYSTEM_VERSION: u8 = 3;

/// Async client for the LetzAI image generation API.
///
/// Generation is asynchronous on the service side: `create_image` returns a
/// job id which is then probed via `image_status` until the image is ready.
///
/// # Example
/// ```no_run
/// use image_pair_queue::{LetzAiClient, GenerationRequest, QualityMode};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LetzAiClient::new("my-api-key");
/// let job_id = client
///     .create_image(&GenerationRequest {
///         prompt: "a sunset over mountains".into(),
///         width: 1024,
///         height: 1024,
///         quality_mode: QualityMode::Default,
///     })
///     .await?;
/// let image_url = client
///     .wait_for_completion(
///         &job_id,
///         Duration::from_secs(2),
///         Duration::from_secs(300),
///         |progress, message| println!("{}% {}", progress, message),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LetzAiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl LetzAiClient {
    /// Create a client for the public LetzAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (e.g. a test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a custom `reqwest::Client` (for connection pooling, TLS, proxies).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Submit a create-image request. Returns the job id to poll.
    pub async fn create_image(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/images", self.base_url);
        let (quality, creativity) = request.quality_mode.request_params();
        let body = CreateImageBody {
            prompt: &request.prompt,
            width: request.width,
            height: request.height,
            quality,
            creativity,
            has_watermark: false,
            system_version: SYSTEM_VERSION,
            mode: request.quality_mode.as_str(),
        };

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network {
                context: format!("Cannot reach LetzAI at {}", self.base_url),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body_text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status,
                body: body_text,
            });
        }

        let created: CreateImageResponse =
            resp.json().await.map_err(|e| GenerationError::Network {
                context: "Failed to parse LetzAI create response".into(),
                source: e,
            })?;

        if created.id.is_empty() {
            return Err(GenerationError::InvalidResponse(
                "Create response missing image id".into(),
            ));
        }
        Ok(created.id)
    }

    /// Fetch the current status of a generation job.
    pub async fn image_status(&self, image_id: &str) -> Result<PollStatus, GenerationError> {
        let url = format!("{}/images/{}", self.base_url, image_id);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| GenerationError::Network {
                context: format!("Cannot reach LetzAI at {}", self.base_url),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body_text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status,
                body: body_text,
            });
        }

        let wire: ImageStatusResponse =
            resp.json().await.map_err(|e| GenerationError::Network {
                context: "Failed to parse LetzAI status response".into(),
                source: e,
            })?;
        Ok(wire.into_poll_status())
    }

    /// Poll `image_status` until the image is ready, reporting progress on
    /// each tick.
    pub async fn wait_for_completion<F>(
        &self,
        image_id: &str,
        interval: Duration,
        timeout: Duration,
        on_progress: F,
    ) -> Result<String, PollError<GenerationError>>
    where
        F: FnMut(u8, &str),
    {
        poll::poll_until_ready(
            || self.image_status(image_id),
            interval,
            timeout,
            on_progress,
        )
        .await
    }
}

impl GenerationBackend for LetzAiClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.create_image(request).await
    }

    async fn probe(&self, job_id: &str) -> Result<PollStatus, GenerationError> {
        self.image_status(job_id).await
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateImageBody<'a> {
    prompt: &'a str,
    width: u32,
    height: u32,
    quality: u8,
    creativity: u8,
    has_watermark: bool,
    system_version: u8,
    mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateImageResponse {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
enum JobState {
    #[serde(rename = "new")]
    New,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "failed")]
    Failed,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageStatusResponse {
    status: JobState,
    #[serde(default)]
    progress: u8,
    #[serde(default)]
    progress_message: String,
    #[serde(default)]
    image_versions: ImageVersions,
}

#[derive(Debug, Default, Deserialize)]
struct ImageVersions {
    #[serde(default)]
    original: Option<String>,
}

impl ImageStatusResponse {
    fn into_poll_status(self) -> PollStatus {
        let message = if !self.progress_message.is_empty() {
            self.progress_message
        } else if self.status == JobState::Failed {
            "Image generation failed".to_string()
        } else {
            "Generating image...".to_string()
        };

        PollStatus {
            state: match self.status {
                JobState::New => PollState::Queued,
                JobState::InProgress => PollState::InProgress,
                JobState::Ready => PollState::Ready,
                JobState::Failed => PollState::Failed,
            },
            progress: self.progress.min(100),
            message,
            result: self.image_versions.original,
        }
    }
}
