//! # Paystack Webhooks Core
//!
//! Domain logic for receiving Paystack webhooks: signature verification, the
//! catalog of known event types, deduplication of redelivered events and
//! dispatch to per-event handlers.
//!
//! ## Architecture
//!
//! - Business logic depends only on trait abstractions ([`WebhookEventStore`],
//!   [`PaymentRecordStore`], [`SignalSubscriber`])
//! - Infrastructure implementations live in [`adapters`] and are injected at
//!   runtime by the composition root
//! - Nothing here is a process-wide singleton; every dispatcher owns its own
//!   handler registry and dedup cache
//!
//! ## Usage
//!
//! ```rust
//! use paystack_webhooks_core::events::IncomingEvent;
//! use serde_json::json;
//!
//! let data = json!({ "reference": "ref_1", "amount": 5000 });
//! let event = IncomingEvent::from_value("charge.success", data).unwrap();
//! assert_eq!(event.event_id.as_str(), "charge.success_ref_1");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard result type for validation of inbound values
pub type ValidationResult<T> = Result<T, ValidationError>;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Identifier of a single logical webhook event occurrence
///
/// Derived from the event type and the first identifying field of the event
/// data, see [`events::IncomingEvent::new`]. The same real-world event always
/// produces the same identifier, which makes it usable as the unique key of
/// the durable event store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Create an event ID from an existing value
    pub fn new(value: impl Into<String>) -> ValidationResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "event_id".to_string(),
            });
        }

        Ok(Self(value))
    }

    /// Build an event ID from its two components
    pub(crate) fn from_parts(event_type: &str, discriminator: &str) -> Self {
        Self(format!("{}_{}", event_type, discriminator))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Storage adapters (in-memory and filesystem)
pub mod adapters;

/// Bounded dedup cache backed by the durable event store
pub mod dedup;

/// Event type to handler mapping and invocation
pub mod dispatcher;

/// Closed catalog of Paystack event types and the typed event view
pub mod events;

/// Built-in handlers for the known event types
pub mod handlers;

/// Transaction, subscription and transfer records written by handlers
pub mod records;

/// Secret container with redacted output and zeroize-on-drop
pub mod secret;

/// HMAC-SHA512 webhook signature verification
pub mod signature;

/// Named notifications published to external subscribers
pub mod signals;

/// Durable record of every received webhook
pub mod store;

// Re-export key types for convenience
pub use adapters::{FilesystemWebhookEventStore, InMemoryPaymentRecords, InMemoryWebhookEventStore};
pub use dedup::EventDeduplicator;
pub use dispatcher::{
    DispatchOutcome, EventDispatcher, EventHandler, HandlerError, HandlerRegistry, IgnoreReason,
    WebhookProcessingError,
};
pub use events::{EventCategory, EventData, EventKind, IncomingEvent};
pub use handlers::{DefaultAction, DefaultHandler, HandlerSettings};
pub use records::{
    ChargeSettlement, PaymentRecordStore, SubscriptionChanges, SubscriptionRecord, TransactionChanges,
    TransactionRecord, TransferChanges, TransferRecord,
};
pub use secret::SecretValue;
pub use signature::{SignatureMode, SignatureVerifier};
pub use signals::{Signal, SignalBus, SignalSubscriber};
pub use store::{StoreError, StoredWebhookRecord, WebhookEventStore};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
