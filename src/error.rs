use std::time::Duration;

use thiserror::Error;

/// Errors returned by queue operations.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The request carries neither a base prompt nor an uploaded image.
    #[error("an item needs either a base prompt or an uploaded image")]
    MissingSource,

    /// The request carries both a base prompt and an uploaded image.
    #[error("an item cannot carry both a base prompt and an uploaded image")]
    ConflictingSources,

    #[error("{0}")]
    Other(String),
}

/// Errors returned by the LetzAI generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// LetzAI returned a non-success HTTP status.
    #[error("LetzAI returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The response was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Terminal failure of a poll loop: exactly one of these (or the success
/// value) is produced per loop, never more than one.
#[derive(Error, Debug)]
pub enum PollError<E>
where
    E: std::error::Error + 'static,
{
    /// The deadline elapsed before the job reached a terminal status.
    #[error("image generation timed out after {0:?}")]
    Timeout(Duration),

    /// The service reported the job as failed.
    #[error("{0}")]
    Failed(String),

    /// A status probe itself failed.
    #[error(transparent)]
    Probe(E),
}

/// Errors returned by the OpenAI image-edit transform.
#[derive(Error, Debug)]
pub enum TransformError {
    /// OpenAI returned a non-success HTTP status.
    #[error("OpenAI returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The response was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// The stage-1 image reference could not be resolved into bytes.
    #[error("could not read source image: {0}")]
    SourceImage(String),
}
