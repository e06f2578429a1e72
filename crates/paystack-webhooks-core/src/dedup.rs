//! Duplicate detection for redelivered webhooks.
//!
//! Paystack retries deliveries it did not see acknowledged, so the same event
//! can arrive several times. Processed identifiers are remembered in a small
//! in-memory cache; when a durable [`WebhookEventStore`] is configured it is
//! consulted on a cache miss, which lets a freshly started process recognise
//! events handled before the restart.

use crate::store::WebhookEventStore;
use crate::EventId;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Cache size above which eviction starts
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Insertion-ordered set of processed event identifiers
///
/// When the set grows past `capacity` entries the oldest half of the
/// capacity is evicted in one step.
#[derive(Debug)]
pub struct ProcessedCache {
    order: VecDeque<EventId>,
    members: HashSet<EventId>,
    capacity: usize,
}

impl ProcessedCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity + 1),
            members: HashSet::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn contains(&self, event_id: &EventId) -> bool {
        self.members.contains(event_id)
    }

    /// Record an identifier, evicting the oldest entries when over capacity
    pub fn insert(&mut self, event_id: EventId) {
        if !self.members.insert(event_id.clone()) {
            return;
        }
        self.order.push_back(event_id);

        if self.order.len() > self.capacity {
            let evict = self.capacity / 2;
            for old in self.order.drain(..evict) {
                self.members.remove(&old);
            }
            debug!(
                evicted = evict,
                remaining = self.order.len(),
                "Evicted oldest entries from processed-event cache"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ProcessedCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Answers "has this event already been applied?"
///
/// ```
/// use paystack_webhooks_core::{EventDeduplicator, EventId};
///
/// # tokio_test::block_on(async {
/// let dedup = EventDeduplicator::in_memory();
/// let id = EventId::new("charge.success_ref_1").unwrap();
///
/// assert!(!dedup.is_duplicate(&id).await);
/// dedup.mark_processed(&id);
/// assert!(dedup.is_duplicate(&id).await);
/// # });
/// ```
pub struct EventDeduplicator {
    cache: Mutex<ProcessedCache>,
    durable: Option<Arc<dyn WebhookEventStore>>,
}

impl EventDeduplicator {
    /// Deduplicator backed only by the in-memory cache
    pub fn in_memory() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, None)
    }

    pub fn new(capacity: usize, durable: Option<Arc<dyn WebhookEventStore>>) -> Self {
        Self {
            cache: Mutex::new(ProcessedCache::new(capacity)),
            durable,
        }
    }

    /// Check the cache, then the durable store for a processed record
    ///
    /// A failing durable lookup is logged and treated as "not a duplicate";
    /// the store's unique key still prevents double recording.
    pub async fn is_duplicate(&self, event_id: &EventId) -> bool {
        if self.is_cached(event_id) {
            return true;
        }

        let Some(store) = &self.durable else {
            return false;
        };

        match store.is_processed(event_id).await {
            Ok(processed) => processed,
            Err(e) => {
                warn!(
                    event_id = %event_id,
                    error = %e,
                    "Durable duplicate lookup failed, treating event as new"
                );
                false
            }
        }
    }

    /// Remember an identifier as processed in the in-memory cache
    pub fn mark_processed(&self, event_id: &EventId) {
        self.lock_cache().insert(event_id.clone());
    }

    /// Check the in-memory cache only
    pub fn is_cached(&self, event_id: &EventId) -> bool {
        self.lock_cache().contains(event_id)
    }

    pub fn cached_len(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> MutexGuard<'_, ProcessedCache> {
        // The cache holds no invariants a panicking writer could break
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventDeduplicator {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for EventDeduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDeduplicator")
            .field("cached", &self.cached_len())
            .field("durable", &self.durable.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
