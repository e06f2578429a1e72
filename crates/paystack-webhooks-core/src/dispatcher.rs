//! # Event Dispatcher
//!
//! Routes a parsed event to the handler registered for its [`EventKind`].
//!
//! Dispatch runs these steps in order:
//!
//! 1. Unknown event types are logged and ignored.
//! 2. Events whose identifier was already processed are reported as
//!    duplicates without invoking a handler.
//! 3. Event kinds without a registered handler are logged and ignored.
//! 4. The handler runs; any failure becomes a [`WebhookProcessingError`].
//! 5. On success the identifier is remembered as processed.

use crate::dedup::EventDeduplicator;
use crate::events::{self, EventData, EventKind, IncomingEvent};
use crate::handlers::{DefaultAction, DefaultHandler};
use crate::EventId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Boxed error returned by event handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handler for one or more event kinds
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, kind: EventKind, event: &IncomingEvent) -> Result<(), HandlerError>;
}

/// Why an event was accepted without running a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownEventType,
    NoHandler,
}

/// Result of a dispatch that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Duplicate,
    Ignored(IgnoreReason),
}

/// A handler failed while processing an event
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to handle webhook event: {message}")]
pub struct WebhookProcessingError {
    pub event_type: String,
    pub event_id: EventId,
    pub message: String,
}

// ============================================================================
// Handler Registry
// ============================================================================

/// One handler per event kind; registering again replaces the previous one
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `handler` bound to every kind that has a built-in action
    pub fn with_defaults(handler: Arc<DefaultHandler>) -> Self {
        let mut registry = Self::new();
        for kind in EventKind::ALL {
            if DefaultAction::for_kind(kind).is_some() {
                registry.register(kind, handler.clone());
            }
        }
        registry
    }

    /// Bind `handler` to `kind`, returning the handler it replaced
    pub fn register(
        &mut self,
        kind: EventKind,
        handler: Arc<dyn EventHandler>,
    ) -> Option<Arc<dyn EventHandler>> {
        info!(event_type = %kind, "Registered webhook handler");
        self.handlers.insert(kind, handler)
    }

    pub fn get(&self, kind: EventKind) -> Option<Arc<dyn EventHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Owns a handler registry and a deduplicator
#[derive(Debug)]
pub struct EventDispatcher {
    registry: RwLock<HandlerRegistry>,
    deduplicator: EventDeduplicator,
}

impl EventDispatcher {
    pub fn new(registry: HandlerRegistry, deduplicator: EventDeduplicator) -> Self {
        Self {
            registry: RwLock::new(registry),
            deduplicator,
        }
    }

    /// Replace or add the handler for `kind`
    pub fn register(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .register(kind, handler);
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(kind)
    }

    pub fn deduplicator(&self) -> &EventDeduplicator {
        &self.deduplicator
    }

    /// Dispatch raw event parts
    pub async fn dispatch(
        &self,
        event_type: &str,
        data: EventData,
    ) -> Result<DispatchOutcome, WebhookProcessingError> {
        if !events::is_valid(event_type) {
            warn!(event_type = %event_type, "Unknown webhook event type");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::UnknownEventType));
        }

        let event = IncomingEvent::new(event_type, data);
        self.dispatch_event(&event).await
    }

    /// Dispatch an already built event
    #[instrument(skip(self, event), fields(event_type = %event.event_type, event_id = %event.event_id))]
    pub async fn dispatch_event(
        &self,
        event: &IncomingEvent,
    ) -> Result<DispatchOutcome, WebhookProcessingError> {
        let Some(kind) = event.kind() else {
            warn!("Unknown webhook event type");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::UnknownEventType));
        };

        if self.deduplicator.is_duplicate(&event.event_id).await {
            info!("Duplicate event detected, skipping");
            return Ok(DispatchOutcome::Duplicate);
        }

        let handler = self
            .registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(kind);
        let Some(handler) = handler else {
            warn!("No handler registered for event type");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::NoHandler));
        };

        debug!("Processing webhook event");
        if let Err(e) = handler.handle(kind, event).await {
            error!(error = %e, "Error handling webhook event");
            return Err(WebhookProcessingError {
                event_type: event.event_type.clone(),
                event_id: event.event_id.clone(),
                message: e.to_string(),
            });
        }

        self.deduplicator.mark_processed(&event.event_id);
        info!("Successfully processed webhook event");
        Ok(DispatchOutcome::Handled)
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
