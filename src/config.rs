use std::time::Duration;

use crate::types::QueueItem;

/// API credentials for the two external services.
///
/// Dispatch eligibility is a pure function of an item and this set: the
/// transform credential is always required, the generation credential only
/// for items without an uploaded image. Blank keys count as absent.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub letzai_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Credentials {
    pub fn new(letzai_api_key: impl Into<String>, openai_api_key: impl Into<String>) -> Self {
        Self {
            letzai_api_key: non_blank(letzai_api_key.into()),
            openai_api_key: non_blank(openai_api_key.into()),
        }
    }

    /// Only the transform credential; uploaded-image items can still run.
    pub fn transform_only(openai_api_key: impl Into<String>) -> Self {
        Self {
            letzai_api_key: None,
            openai_api_key: non_blank(openai_api_key.into()),
        }
    }

    pub(crate) fn allows_dispatch(&self, item: &QueueItem) -> bool {
        if self.openai_api_key.is_none() {
            return false;
        }
        item.has_uploaded_image() || self.letzai_api_key.is_some()
    }
}

fn non_blank(key: String) -> Option<String> {
    if key.trim().is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Configuration for the generation queue.
///
/// Use [`QueueConfig::builder()`] for ergonomic construction, or
/// [`QueueConfig::default()`] for the reference timings (2s probes,
/// 5 minute generation deadline, no credentials).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Wait between stage-1 status probes.
    pub poll_interval: Duration,

    /// Hard deadline for a stage-1 generation, measured from submit.
    pub generation_timeout: Duration,

    /// Credentials gating dispatch.
    pub credentials: Credentials,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            generation_timeout: Duration::from_secs(300),
            credentials: Credentials::default(),
        }
    }
}

impl QueueConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> QueueConfigBuilder {
        QueueConfigBuilder::default()
    }
}

/// Builder for [`QueueConfig`].
#[derive(Default)]
pub struct QueueConfigBuilder {
    config: QueueConfig,
}

impl QueueConfigBuilder {
    /// Set the wait between stage-1 status probes.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the overall stage-1 deadline.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.generation_timeout = timeout;
        self
    }

    /// Set the credentials gating dispatch.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Build the final [`QueueConfig`].
    pub fn build(self) -> QueueConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PairRequest, UploadedImage};

    fn prompt_item() -> QueueItem {
        QueueItem::new(PairRequest::from_prompt("a room", "make it 3D"), 1)
    }

    fn upload_item() -> QueueItem {
        let image = UploadedImage::new("image/png", vec![0]);
        QueueItem::new(PairRequest::from_upload(image, "make it 3D"), 1)
    }

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.generation_timeout, Duration::from_secs(300));
        assert!(config.credentials.letzai_api_key.is_none());
    }

    #[test]
    fn test_builder() {
        let config = QueueConfig::builder()
            .with_poll_interval(Duration::from_millis(500))
            .with_generation_timeout(Duration::from_secs(30))
            .with_credentials(Credentials::new("lk", "ok"))
            .build();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
        assert_eq!(config.credentials.letzai_api_key.as_deref(), Some("lk"));
    }

    #[test]
    fn test_blank_keys_count_as_absent() {
        let credentials = Credentials::new("  ", "");
        assert!(credentials.letzai_api_key.is_none());
        assert!(credentials.openai_api_key.is_none());
    }

    #[test]
    fn test_dispatch_needs_both_keys_for_prompt_items() {
        assert!(Credentials::new("lk", "ok").allows_dispatch(&prompt_item()));
        assert!(!Credentials::transform_only("ok").allows_dispatch(&prompt_item()));
        assert!(!Credentials::default().allows_dispatch(&prompt_item()));
    }

    #[test]
    fn test_dispatch_upload_items_need_only_transform_key() {
        assert!(Credentials::transform_only("ok").allows_dispatch(&upload_item()));
        assert!(!Credentials::default().allows_dispatch(&upload_item()));
        // A generation key alone is not enough either way.
        assert!(!Credentials::new("lk", "").allows_dispatch(&upload_item()));
    }
}
