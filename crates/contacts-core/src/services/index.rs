use crate::types::ResourceId;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Receives fire-and-forget requests to refresh a resource's search entry.
pub trait IndexScheduler: Send + Sync {
    fn request_reindex(&self, id: ResourceId);
}

/// Drops every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndexer;

impl IndexScheduler for NoopIndexer {
    fn request_reindex(&self, _id: ResourceId) {}
}

/// Keeps a deduplicated FIFO of pending ids for the host's text indexer to
/// drain at its own pace.
#[derive(Debug, Default)]
pub struct QueuedIndexer {
    pending: Mutex<VecDeque<ResourceId>>,
}

impl QueuedIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything queued so far.
    pub fn drain(&self) -> Vec<ResourceId> {
        match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn is_pending(&self, id: ResourceId) -> bool {
        self.pending
            .lock()
            .map(|p| p.contains(&id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IndexScheduler for QueuedIndexer {
    fn request_reindex(&self, id: ResourceId) {
        match self.pending.lock() {
            Ok(mut pending) => {
                if !pending.contains(&id) {
                    pending.push_back(id);
                }
            }
            Err(_) => log::warn!("Reindex queue poisoned, dropping request for {}", id),
        }
    }
}
