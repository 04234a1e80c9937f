use serde::{Deserialize, Serialize};

use crate::types::QueueItem;

/// Events broadcast by the queue for a UI layer to render.
///
/// `ItemUpdated` carries a full snapshot on every status or progress change;
/// the terminal variants are suitable for toast-style notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueEvent {
    #[serde(rename_all = "camelCase")]
    ItemUpdated { item: QueueItem },

    #[serde(rename_all = "camelCase")]
    ItemCompleted { id: String, sequence_number: u32 },

    #[serde(rename_all = "camelCase")]
    ItemFailed {
        id: String,
        sequence_number: u32,
        error: String,
    },
}

/// Per-status tallies across the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}
