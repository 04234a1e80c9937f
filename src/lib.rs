//! # image-pair-queue
//!
//! Concurrent two-stage image pair generation queue for dataset creation.
//!
//! A work item pairs a "before" prompt (or an uploaded image) with an
//! "after" prompt. Stage 1 generates the base image through the LetzAI API,
//! polling the asynchronous job to completion with live progress; stage 2
//! pushes that image through the OpenAI image-edit endpoint. Each item moves
//! through a small state machine (`pending → generating → transforming →
//! completed/error`) and a full snapshot is broadcast on every change, so a
//! UI can render the queue without owning any of its logic.
//!
//! All pending items run concurrently in independent tasks; one item's
//! failure or slowness never affects another. A failed item stays in the
//! queue with its reason attached until the user removes it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use image_pair_queue::{
//!     Credentials, GenerationQueue, LetzAiClient, OpenAiImageClient, PairRequest, QueueConfig,
//! };
//!
//! # async fn example() -> Result<(), image_pair_queue::QueueError> {
//! let config = QueueConfig::builder()
//!     .with_credentials(Credentials::new("letzai-key", "openai-key"))
//!     .build();
//! let queue = GenerationQueue::new(
//!     LetzAiClient::new("letzai-key"),
//!     OpenAiImageClient::new("openai-key"),
//!     config,
//! );
//!
//! let mut events = queue.subscribe();
//! queue.enqueue(
//!     PairRequest::from_prompt("a cozy reading nook", "turn it into a tiny 3D diorama")
//!         .size(1024, 1024),
//! )?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod letzai;
pub mod openai;
mod pipeline;
pub mod poll;
pub mod queue;
pub mod types;

pub use config::{Credentials, QueueConfig, QueueConfigBuilder};
pub use error::{GenerationError, PollError, QueueError, TransformError};
pub use events::{QueueCounts, QueueEvent};
pub use letzai::LetzAiClient;
pub use openai::OpenAiImageClient;
pub use poll::{PollState, PollStatus};
pub use queue::GenerationQueue;
pub use types::{
    output_basename, GenerationRequest, ItemStatus, PairRequest, PairSide, QualityMode, QueueItem,
    TransformRequest, UploadedImage,
};

/// Stage-1 backend: an asynchronous image generation service.
///
/// `submit` starts a job and returns its handle; `probe` reports the job's
/// current status. The queue drives the pair through its poll loop, so
/// implementations stay single-request thin.
pub trait GenerationBackend: Send + Sync + 'static {
    /// Submit a create-image request, returning the job handle to poll.
    fn submit(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<String, GenerationError>> + Send;

    /// Fetch the current status of a submitted job.
    fn probe(
        &self,
        job_id: &str,
    ) -> impl std::future::Future<Output = Result<PollStatus, GenerationError>> + Send;
}

/// Stage-2 backend: a single-request image transform service.
///
/// `on_message` receives short descriptive status text while the call runs;
/// the transform reports no numeric progress.
pub trait TransformBackend: Send + Sync + 'static {
    /// Transform the source image per the request's prompt, returning a
    /// reference to the transformed image.
    fn transform(
        &self,
        request: &TransformRequest,
        on_message: impl FnMut(&str) + Send,
    ) -> impl std::future::Future<Output = Result<String, TransformError>> + Send;
}
