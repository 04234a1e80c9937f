use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::events::{QueueCounts, QueueEvent};
use crate::pipeline;
use crate::types::{ItemStatus, PairRequest, QueueItem};
use crate::{GenerationBackend, TransformBackend};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Orchestrator owning the queue of pair-generation work items.
///
/// Every pending item the configured credentials allow is driven through
/// its two-stage pipeline by an independent tokio task, so unrelated items
/// never wait on each other. Item state lives in one shared list; all
/// mutations are keyed single-item read-modify-write operations, and each
/// change broadcasts a fresh snapshot to subscribers.
///
/// Cloning the queue is cheap and shares the same state.
pub struct GenerationQueue<G, T> {
    inner: Arc<QueueInner<G, T>>,
}

impl<G, T> Clone for GenerationQueue<G, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct QueueInner<G, T> {
    items: Mutex<Vec<QueueItem>>,
    pub(crate) config: QueueConfig,
    pub(crate) generation: G,
    pub(crate) transform: T,
    pub(crate) events: broadcast::Sender<QueueEvent>,
    next_sequence: AtomicU32,
}

impl<G, T> GenerationQueue<G, T>
where
    G: GenerationBackend,
    T: TransformBackend,
{
    /// Create a queue over the given backends.
    pub fn new(generation: G, transform: T, config: QueueConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(QueueInner {
                items: Mutex::new(Vec::new()),
                config,
                generation,
                transform,
                events,
                next_sequence: AtomicU32::new(1),
            }),
        }
    }

    /// Subscribe to item snapshots and terminal notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Add a new work item in `Pending` status and dispatch anything the
    /// configured credentials allow. Returns the assigned item id.
    pub fn enqueue(&self, request: PairRequest) -> Result<String, QueueError> {
        request.validate()?;

        let sequence = self.inner.next_sequence.fetch_add(1, Ordering::Relaxed);
        let item = QueueItem::new(request, sequence);
        let id = item.id.clone();
        {
            let mut items = self
                .inner
                .items
                .lock()
                .map_err(|e| QueueError::Other(e.to_string()))?;
            items.push(item.clone());
        }

        let _ = self.inner.events.send(QueueEvent::ItemUpdated { item });
        QueueInner::dispatch_pending(&self.inner);
        Ok(id)
    }

    /// Remove an item regardless of status. Returns whether it existed.
    ///
    /// An in-flight pipeline task is not cancelled; every one of its updates
    /// goes through a keyed lookup, so once the item is gone the remaining
    /// work is silently discarded and nothing resurfaces.
    pub fn remove(&self, id: &str) -> bool {
        let mut items = match self.inner.items.lock() {
            Ok(items) => items,
            Err(_) => return false,
        };
        let before = items.len();
        items.retain(|item| item.id != id);
        items.len() != before
    }

    /// Remove every completed item, returning how many were dropped.
    pub fn clear_completed(&self) -> usize {
        let mut items = match self.inner.items.lock() {
            Ok(items) => items,
            Err(_) => return 0,
        };
        let before = items.len();
        items.retain(|item| item.status != ItemStatus::Completed);
        before - items.len()
    }

    /// Get a snapshot of a single item.
    pub fn get(&self, id: &str) -> Option<QueueItem> {
        self.inner.get_item(id)
    }

    /// Get a snapshot of all items in enqueue order.
    pub fn items(&self) -> Vec<QueueItem> {
        self.inner
            .items
            .lock()
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    /// Per-status tallies, as shown in the queue header.
    pub fn counts(&self) -> QueueCounts {
        let items = match self.inner.items.lock() {
            Ok(items) => items,
            Err(_) => return QueueCounts::default(),
        };
        let mut counts = QueueCounts::default();
        for item in items.iter() {
            match item.status {
                ItemStatus::Pending => counts.pending += 1,
                ItemStatus::Generating | ItemStatus::Transforming => counts.processing += 1,
                ItemStatus::Completed => counts.completed += 1,
                ItemStatus::Error => counts.failed += 1,
            }
        }
        counts
    }
}

impl<G, T> QueueInner<G, T>
where
    G: GenerationBackend,
    T: TransformBackend,
{
    /// Launch a pipeline task for every eligible pending item. Called on
    /// every queue change and whenever a pipeline task finishes; the
    /// per-item `dispatched` flag keeps a scan from launching twice.
    pub(crate) fn dispatch_pending(inner: &Arc<Self>) {
        let ready = {
            let mut items = match inner.items.lock() {
                Ok(items) => items,
                Err(e) => {
                    eprintln!("[image-pair-queue] items mutex poisoned: {}", e);
                    return;
                }
            };
            let mut ready = Vec::new();
            for item in items.iter_mut() {
                if item.status == ItemStatus::Pending
                    && !item.dispatched
                    && inner.config.credentials.allows_dispatch(item)
                {
                    item.dispatched = true;
                    ready.push(item.id.clone());
                }
            }
            ready
        };

        for id in ready {
            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                pipeline::run_item(inner, id).await;
            });
        }
    }
}

impl<G, T> QueueInner<G, T> {
    pub(crate) fn get_item(&self, id: &str) -> Option<QueueItem> {
        self.items
            .lock()
            .ok()?
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    /// Apply a keyed single-item mutation and broadcast the new snapshot.
    ///
    /// Returns `None` when the item was removed or is already terminal; the
    /// mutation is discarded in both cases, so a removed item's late updates
    /// never resurrect it and terminal items never change again.
    pub(crate) fn update_item<F>(&self, id: &str, mutate: F) -> Option<QueueItem>
    where
        F: FnOnce(&mut QueueItem),
    {
        let snapshot = {
            let mut items = self.items.lock().ok()?;
            let item = items.iter_mut().find(|item| item.id == id)?;
            if item.status.is_terminal() {
                return None;
            }
            mutate(item);
            item.clone()
        };
        let _ = self.events.send(QueueEvent::ItemUpdated {
            item: snapshot.clone(),
        });
        Some(snapshot)
    }

    /// Record a terminal failure and notify subscribers.
    pub(crate) fn fail_item(&self, id: &str, reason: String) {
        let failed = self.update_item(id, |item| {
            item.status = ItemStatus::Error;
            item.status_message = format!("Error: {}", reason);
            item.error = Some(reason.clone());
        });
        if let Some(item) = failed {
            let _ = self.events.send(QueueEvent::ItemFailed {
                id: item.id,
                sequence_number: item.sequence_number,
                error: reason,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, TransformError};
    use crate::poll::{PollState, PollStatus};
    use crate::types::{GenerationRequest, TransformRequest, UploadedImage};

    struct NoopGeneration;

    impl GenerationBackend for NoopGeneration {
        async fn submit(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            Ok("job".into())
        }

        async fn probe(&self, _job_id: &str) -> Result<PollStatus, GenerationError> {
            Ok(PollStatus {
                state: PollState::Ready,
                progress: 100,
                message: "Image ready".into(),
                result: Some("img://noop".into()),
            })
        }
    }

    struct NoopTransform;

    impl TransformBackend for NoopTransform {
        async fn transform(
            &self,
            _request: &TransformRequest,
            _on_message: impl FnMut(&str) + Send,
        ) -> Result<String, TransformError> {
            Ok("img://noop".into())
        }
    }

    // No credentials configured: enqueue never spawns, so these tests can
    // exercise pure queue state without a runtime.
    fn idle_queue() -> GenerationQueue<NoopGeneration, NoopTransform> {
        GenerationQueue::new(NoopGeneration, NoopTransform, QueueConfig::default())
    }

    #[test]
    fn test_enqueue_assigns_id_and_sequence() {
        let queue = idle_queue();
        let a = queue
            .enqueue(PairRequest::from_prompt("one", "t"))
            .unwrap();
        let b = queue
            .enqueue(PairRequest::from_prompt("two", "t"))
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(queue.get(&a).unwrap().sequence_number, 1);
        assert_eq!(queue.get(&b).unwrap().sequence_number, 2);
    }

    #[test]
    fn test_enqueue_rejects_invalid_requests() {
        let queue = idle_queue();
        assert!(matches!(
            queue.enqueue(PairRequest::from_prompt("", "t")),
            Err(QueueError::MissingSource)
        ));

        let mut both = PairRequest::from_prompt("p", "t");
        both.uploaded_image = Some(UploadedImage::new("image/png", vec![0]));
        assert!(matches!(
            queue.enqueue(both),
            Err(QueueError::ConflictingSources)
        ));
        assert!(queue.items().is_empty());
    }

    #[test]
    fn test_enqueue_emits_pending_snapshot() {
        let queue = idle_queue();
        let mut events = queue.subscribe();
        let id = queue.enqueue(PairRequest::from_prompt("p", "t")).unwrap();

        match events.try_recv().unwrap() {
            QueueEvent::ItemUpdated { item } => {
                assert_eq!(item.id, id);
                assert_eq!(item.status, ItemStatus::Pending);
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_remove() {
        let queue = idle_queue();
        let id = queue.enqueue(PairRequest::from_prompt("p", "t")).unwrap();

        assert!(queue.remove(&id));
        assert!(queue.get(&id).is_none());
        assert!(!queue.remove(&id));
        assert!(!queue.remove("nonexistent"));
    }

    #[test]
    fn test_clear_completed_only_drops_completed() {
        let queue = idle_queue();
        let a = queue.enqueue(PairRequest::from_prompt("a", "t")).unwrap();
        let b = queue.enqueue(PairRequest::from_prompt("b", "t")).unwrap();
        queue
            .inner
            .update_item(&a, |item| item.status = ItemStatus::Completed);

        assert_eq!(queue.clear_completed(), 1);
        assert!(queue.get(&a).is_none());
        assert!(queue.get(&b).is_some());
        assert_eq!(queue.clear_completed(), 0);
    }

    #[test]
    fn test_counts() {
        let queue = idle_queue();
        let a = queue.enqueue(PairRequest::from_prompt("a", "t")).unwrap();
        let b = queue.enqueue(PairRequest::from_prompt("b", "t")).unwrap();
        queue.enqueue(PairRequest::from_prompt("c", "t")).unwrap();
        queue
            .inner
            .update_item(&a, |item| item.status = ItemStatus::Transforming);
        queue.inner.fail_item(&b, "boom".into());

        let counts = queue.counts();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.completed, 0);
        assert_eq!(counts.failed, 1);
    }

    #[test]
    fn test_update_item_guards_terminal_states() {
        let queue = idle_queue();
        let id = queue.enqueue(PairRequest::from_prompt("p", "t")).unwrap();
        queue.inner.fail_item(&id, "first failure".into());

        // Terminal items reject all further mutation.
        assert!(queue
            .inner
            .update_item(&id, |item| item.progress = 55)
            .is_none());
        let item = queue.get(&id).unwrap();
        assert_eq!(item.progress, 0);
        assert_eq!(item.error.as_deref(), Some("first failure"));
    }

    #[test]
    fn test_update_item_discards_removed() {
        let queue = idle_queue();
        let id = queue.enqueue(PairRequest::from_prompt("p", "t")).unwrap();
        queue.remove(&id);

        assert!(queue
            .inner
            .update_item(&id, |item| item.progress = 55)
            .is_none());
        assert!(queue.get(&id).is_none());
    }
}
