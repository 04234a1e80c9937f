use std::sync::Arc;

use crate::events::QueueEvent;
use crate::poll;
use crate::queue::QueueInner;
use crate::types::{GenerationRequest, ItemStatus, QueueItem, TransformRequest};
use crate::{GenerationBackend, TransformBackend};

/// Drive one queue item through its two stages.
///
/// Runs as an independent tokio task. Every state change goes through the
/// queue's keyed update, which refuses to touch removed or terminal items,
/// so a removal mid-flight silently discards the rest of the work and a
/// failure never leaks past this function into sibling items.
pub(crate) async fn run_item<G, T>(inner: Arc<QueueInner<G, T>>, id: String)
where
    G: GenerationBackend,
    T: TransformBackend,
{
    let Some(item) = inner.get_item(&id) else {
        return;
    };

    if let Some(source) = stage_one(&inner, &id, &item).await {
        stage_two(&inner, &id, &item, source).await;
    }

    QueueInner::dispatch_pending(&inner);
}

/// Produce the stage-1 image reference: either generate it from the base
/// prompt, or substitute the uploaded image directly.
///
/// Returns `None` when the item failed or was removed; failures are already
/// recorded on the item by the time this returns.
async fn stage_one<G, T>(
    inner: &Arc<QueueInner<G, T>>,
    id: &str,
    item: &QueueItem,
) -> Option<String>
where
    G: GenerationBackend,
    T: TransformBackend,
{
    if let Some(upload) = &item.uploaded_image {
        // Pass-through: the upload becomes the stage-1 reference and the
        // item moves straight to the transform stage.
        let data_url = upload.to_data_url();
        inner.update_item(id, |item| {
            item.status = ItemStatus::Transforming;
            item.progress = 0;
            item.base_image = Some(data_url.clone());
            item.status_message = "Preparing uploaded image...".to_string();
        })?;
        return Some(data_url);
    }

    inner.update_item(id, |item| {
        item.status = ItemStatus::Generating;
        item.progress = 0;
        item.status_message = "Sending request to LetzAI...".to_string();
    })?;

    let request = GenerationRequest {
        prompt: item.base_prompt.clone(),
        width: item.width,
        height: item.height,
        quality_mode: item.quality_mode,
    };
    let job_id = match inner.generation.submit(&request).await {
        Ok(job_id) => job_id,
        Err(e) => {
            inner.fail_item(id, e.to_string());
            return None;
        }
    };

    let outcome = poll::poll_until_ready(
        || inner.generation.probe(&job_id),
        inner.config.poll_interval,
        inner.config.generation_timeout,
        |progress, message| {
            inner.update_item(id, |item| {
                item.progress = progress;
                item.status_message = message.to_string();
            });
        },
    )
    .await;

    match outcome {
        Ok(image) => {
            // The result and the stage transition land in one update so no
            // snapshot ever shows a base image outside a post-stage-1 status.
            inner.update_item(id, |item| {
                item.status = ItemStatus::Transforming;
                item.progress = 0;
                item.base_image = Some(image.clone());
                item.status_message = "Preparing image for transform...".to_string();
            })?;
            Some(image)
        }
        Err(e) => {
            inner.fail_item(id, e.to_string());
            None
        }
    }
}

/// Transform the stage-1 image per the item's transform prompt.
async fn stage_two<G, T>(inner: &Arc<QueueInner<G, T>>, id: &str, item: &QueueItem, source: String)
where
    G: GenerationBackend,
    T: TransformBackend,
{
    let request = TransformRequest {
        source_image: source,
        prompt: item.transform_prompt.clone(),
        width: item.width,
        height: item.height,
    };

    let result = inner
        .transform
        .transform(&request, |message| {
            inner.update_item(id, |item| item.status_message = message.to_string());
        })
        .await;

    match result {
        Ok(image) => {
            let completed = inner.update_item(id, |item| {
                item.status = ItemStatus::Completed;
                item.progress = 100;
                item.transformed_image = Some(image.clone());
                item.status_message = "Pair generated successfully!".to_string();
            });
            if let Some(item) = completed {
                let _ = inner.events.send(QueueEvent::ItemCompleted {
                    id: item.id,
                    sequence_number: item.sequence_number,
                });
            }
        }
        Err(e) => inner.fail_item(id, e.to_string()),
    }
}
