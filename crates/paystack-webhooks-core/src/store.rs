//! # Webhook Event Store
//!
//! Durable receipt of every webhook delivery. The ingress endpoint creates a
//! record before dispatch and flips it to processed (or stores the failure)
//! afterwards. The unique key is the [`EventId`]; a second insert for the
//! same identifier fails with [`StoreError::Conflict`], which is how
//! concurrent redeliveries are resolved.
//!
//! An unprocessed record without a failure belongs to a delivery still in
//! flight. Only a record carrying a failure may be taken over by a later
//! delivery, through [`WebhookEventStore::claim_retry`].

use crate::{EventId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A received webhook as persisted by the ingress endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWebhookRecord {
    pub event_type: String,
    pub event_id: EventId,
    pub raw_payload: Value,
    pub processed: bool,
    pub processing_error: Option<String>,
    pub received_at: Timestamp,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl StoredWebhookRecord {
    /// New unprocessed record stamped with the current time
    pub fn new(event_type: impl Into<String>, event_id: EventId, raw_payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            event_id,
            raw_payload,
            processed: false,
            processing_error: None,
            received_at: Timestamp::now(),
            source_ip: None,
            user_agent: None,
        }
    }

    pub fn with_source_ip(mut self, source_ip: Option<String>) -> Self {
        self.source_ip = source_ip;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Errors from webhook event store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record already exists for event: {event_id}")]
    Conflict { event_id: EventId },

    #[error("No record found for event: {event_id}")]
    NotFound { event_id: EventId },

    #[error("Storage operation failed: {message}")]
    OperationFailed { message: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },
}

impl StoreError {
    /// Check if the error is a unique-key conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Persistence of received webhook records
#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Insert a new record
    ///
    /// Fails with [`StoreError::Conflict`] when a record with the same
    /// event identifier already exists.
    async fn insert(&self, record: StoredWebhookRecord) -> Result<(), StoreError>;

    /// Look up a record by event identifier
    async fn get(&self, event_id: &EventId) -> Result<Option<StoredWebhookRecord>, StoreError>;

    /// Mark a record as processed and clear any stored error
    async fn mark_processed(&self, event_id: &EventId) -> Result<(), StoreError>;

    /// Store a processing failure; the record stays unprocessed
    async fn record_failure(&self, event_id: &EventId, message: &str) -> Result<(), StoreError>;

    /// Claim a failed record for another processing attempt
    ///
    /// Returns `true` only when the record is unprocessed and carries a
    /// failure; the failure is cleared in the same step, so at most one
    /// caller wins. Returns `false` for processed records and for records
    /// another delivery is still working on.
    async fn claim_retry(&self, event_id: &EventId) -> Result<bool, StoreError>;

    /// Check whether a processed record exists for the identifier
    async fn is_processed(&self, event_id: &EventId) -> Result<bool, StoreError> {
        Ok(self
            .get(event_id)
            .await?
            .map(|record| record.processed)
            .unwrap_or(false))
    }
}
