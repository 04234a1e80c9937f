use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// LetzAI generation presets, trading speed against output quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    /// Fastest generation, lower quality.
    Turbo,
    /// Faster, works well for close-ups.
    Sigma,
    /// Slow but high quality.
    Default,
}

impl QualityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityMode::Turbo => "turbo",
            QualityMode::Sigma => "sigma",
            QualityMode::Default => "default",
        }
    }

    /// Wire values for the create-image request: (quality, creativity).
    pub(crate) fn request_params(self) -> (u8, u8) {
        match self {
            QualityMode::Turbo => (1, 2),
            QualityMode::Sigma => (2, 2),
            QualityMode::Default => (3, 2),
        }
    }
}

/// Item lifecycle: Pending -> Generating -> Transforming -> Completed/Error.
/// Items with an uploaded image skip Generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemStatus {
    Pending,
    /// Stage 1: the base image is being generated by LetzAI.
    Generating,
    /// Stage 2: the base image is being transformed by OpenAI.
    Transforming,
    Completed,
    Error,
}

impl ItemStatus {
    /// Completed and Error accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Error)
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, ItemStatus::Generating | ItemStatus::Transforming)
    }
}

/// An image supplied by the user in place of stage-1 generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Encode as a data URL, the reference format both stages exchange.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Parameters for a stage-1 base image generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub quality_mode: QualityMode,
}

/// Parameters for a stage-2 transform call. `source_image` is either an
/// HTTP(S) URL or a data URL.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub source_image: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

/// A request for one before/after image pair.
///
/// Exactly one of a non-empty base prompt or an uploaded image is required;
/// the queue rejects anything else at enqueue time.
#[derive(Debug, Clone)]
pub struct PairRequest {
    pub base_prompt: String,
    pub transform_prompt: String,
    pub uploaded_image: Option<UploadedImage>,
    pub width: u32,
    pub height: u32,
    pub quality_mode: QualityMode,
}

impl PairRequest {
    /// Pair generated from a base prompt. Defaults to 1024x1024, Default mode.
    pub fn from_prompt(
        base_prompt: impl Into<String>,
        transform_prompt: impl Into<String>,
    ) -> Self {
        Self {
            base_prompt: base_prompt.into(),
            transform_prompt: transform_prompt.into(),
            uploaded_image: None,
            width: 1024,
            height: 1024,
            quality_mode: QualityMode::Default,
        }
    }

    /// Pair starting from an uploaded image; stage 1 is skipped.
    pub fn from_upload(image: UploadedImage, transform_prompt: impl Into<String>) -> Self {
        Self {
            base_prompt: String::new(),
            transform_prompt: transform_prompt.into(),
            uploaded_image: Some(image),
            width: 1024,
            height: 1024,
            quality_mode: QualityMode::Default,
        }
    }

    /// Set the output dimensions for both stages.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the generation quality preset.
    pub fn quality(mut self, mode: QualityMode) -> Self {
        self.quality_mode = mode;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), QueueError> {
        match (
            self.base_prompt.trim().is_empty(),
            self.uploaded_image.is_some(),
        ) {
            (true, false) => Err(QueueError::MissingSource),
            (false, true) => Err(QueueError::ConflictingSources),
            _ => Ok(()),
        }
    }
}

/// A single unit of work and its visible state.
///
/// Created by [`PairRequest`] at enqueue time and mutated exclusively by its
/// own pipeline task afterwards. Snapshots of this struct are broadcast on
/// every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub base_prompt: String,
    pub transform_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_image: Option<UploadedImage>,
    pub width: u32,
    pub height: u32,
    pub quality_mode: QualityMode,
    /// Ordinal used for deterministic export naming.
    pub sequence_number: u32,
    /// ISO 8601 timestamp of creation.
    pub created_at: String,
    pub status: ItemStatus,
    /// 0-100 within the active stage; reset to 0 when stage 2 starts.
    pub progress: u8,
    /// Short description of current activity, overwritten on every tick.
    pub status_message: String,
    /// Stage-1 result reference (or the substituted upload), write-once.
    pub base_image: Option<String>,
    /// Stage-2 result reference, write-once, set exactly when completed.
    pub transformed_image: Option<String>,
    /// Failure reason, populated only in the Error status.
    pub error: Option<String>,
    #[serde(skip)]
    pub(crate) dispatched: bool,
}

impl QueueItem {
    pub(crate) fn new(request: PairRequest, sequence_number: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            base_prompt: request.base_prompt,
            transform_prompt: request.transform_prompt,
            uploaded_image: request.uploaded_image,
            width: request.width,
            height: request.height,
            quality_mode: request.quality_mode,
            sequence_number,
            created_at: chrono::Utc::now().to_rfc3339(),
            status: ItemStatus::Pending,
            progress: 0,
            status_message: "Waiting in queue...".to_string(),
            base_image: None,
            transformed_image: None,
            error: None,
            dispatched: false,
        }
    }

    /// True when an uploaded image substitutes for stage 1.
    pub fn has_uploaded_image(&self) -> bool {
        self.uploaded_image.is_some()
    }
}

/// Which side of a pair an exported file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSide {
    Start,
    End,
}

/// Deterministic export stem: zero-padded 4-digit sequence number plus side
/// suffix, e.g. `0007_start`. Exporters append their own extension.
pub fn output_basename(sequence_number: u32, side: PairSide) -> String {
    let suffix = match side {
        PairSide::Start => "start",
        PairSide::End => "end",
    };
    format!("{:04}_{}", sequence_number, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_mode_params() {
        assert_eq!(QualityMode::Turbo.request_params(), (1, 2));
        assert_eq!(QualityMode::Sigma.request_params(), (2, 2));
        assert_eq!(QualityMode::Default.request_params(), (3, 2));
        assert_eq!(QualityMode::Sigma.as_str(), "sigma");
    }

    #[test]
    fn test_status_helpers() {
        assert!(ItemStatus::Completed.is_terminal());
        assert!(ItemStatus::Error.is_terminal());
        assert!(!ItemStatus::Pending.is_terminal());
        assert!(ItemStatus::Generating.is_processing());
        assert!(ItemStatus::Transforming.is_processing());
        assert!(!ItemStatus::Completed.is_processing());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ItemStatus::Transforming).unwrap();
        assert_eq!(json, "\"transforming\"");
        let back: ItemStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(back, ItemStatus::Pending);
    }

    #[test]
    fn test_validate_prompt_only() {
        let request = PairRequest::from_prompt("a room", "make it 3D");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_upload_only() {
        let image = UploadedImage::new("image/png", vec![1, 2, 3]);
        let request = PairRequest::from_upload(image, "make it 3D");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_source() {
        let request = PairRequest::from_prompt("   ", "make it 3D");
        assert!(matches!(
            request.validate(),
            Err(QueueError::MissingSource)
        ));
    }

    #[test]
    fn test_validate_conflicting_sources() {
        let mut request = PairRequest::from_prompt("a room", "make it 3D");
        request.uploaded_image = Some(UploadedImage::new("image/png", vec![0]));
        assert!(matches!(
            request.validate(),
            Err(QueueError::ConflictingSources)
        ));
    }

    #[test]
    fn test_pair_request_builder() {
        let request = PairRequest::from_prompt("a", "b")
            .size(1536, 1024)
            .quality(QualityMode::Turbo);
        assert_eq!(request.width, 1536);
        assert_eq!(request.height, 1024);
        assert_eq!(request.quality_mode, QualityMode::Turbo);
    }

    #[test]
    fn test_new_item_defaults() {
        let item = QueueItem::new(PairRequest::from_prompt("a", "b"), 7);
        assert!(!item.id.is_empty());
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.progress, 0);
        assert_eq!(item.sequence_number, 7);
        assert!(item.base_image.is_none());
        assert!(item.transformed_image.is_none());
        assert!(item.error.is_none());
        assert!(!item.dispatched);
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = QueueItem::new(PairRequest::from_prompt("a", "b"), 1);
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"basePrompt\""));
        assert!(json.contains("\"transformPrompt\""));
        assert!(json.contains("\"sequenceNumber\""));
        assert!(json.contains("\"statusMessage\""));
        // Absent upload is omitted entirely.
        assert!(!json.contains("uploadedImage"));
    }

    #[test]
    fn test_data_url_encoding() {
        let image = UploadedImage::new("image/jpeg", b"abc".to_vec());
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn test_output_basename() {
        assert_eq!(output_basename(1, PairSide::Start), "0001_start");
        assert_eq!(output_basename(42, PairSide::End), "0042_end");
        assert_eq!(output_basename(12345, PairSide::Start), "12345_start");
    }
}
