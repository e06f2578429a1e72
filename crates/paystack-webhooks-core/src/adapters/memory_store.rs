//! # In-Memory Stores
//!
//! Thread-safe in-memory implementations of [`WebhookEventStore`] and
//! [`PaymentRecordStore`] for tests, development and deployments that do not
//! need records to survive a restart.

use crate::records::{
    PaymentRecordStore, SubscriptionChanges, SubscriptionRecord, TransactionChanges,
    TransactionRecord, TransferChanges, TransferRecord,
};
use crate::store::{StoreError, StoredWebhookRecord, WebhookEventStore};
use crate::{EventId, Timestamp};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Webhook event records
// ============================================================================

/// In-memory webhook event store keyed by event identifier
#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookEventStore {
    records: Arc<RwLock<HashMap<EventId, StoredWebhookRecord>>>,
}

impl InMemoryWebhookEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl WebhookEventStore for InMemoryWebhookEventStore {
    async fn insert(&self, record: StoredWebhookRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.entry(record.event_id.clone()) {
            Entry::Occupied(existing) => Err(StoreError::Conflict {
                event_id: existing.key().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn get(&self, event_id: &EventId) -> Result<Option<StoredWebhookRecord>, StoreError> {
        Ok(self.records.read().await.get(event_id).cloned())
    }

    async fn mark_processed(&self, event_id: &EventId) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(event_id).ok_or_else(|| StoreError::NotFound {
            event_id: event_id.clone(),
        })?;
        record.processed = true;
        record.processing_error = None;
        Ok(())
    }

    async fn record_failure(&self, event_id: &EventId, message: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(event_id).ok_or_else(|| StoreError::NotFound {
            event_id: event_id.clone(),
        })?;
        record.processed = false;
        record.processing_error = Some(message.to_string());
        Ok(())
    }

    async fn claim_retry(&self, event_id: &EventId) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(event_id).ok_or_else(|| StoreError::NotFound {
            event_id: event_id.clone(),
        })?;
        if record.processed || record.processing_error.is_none() {
            return Ok(false);
        }
        record.processing_error = None;
        Ok(true)
    }
}

// ============================================================================
// Payment records
// ============================================================================

#[derive(Debug, Default)]
struct PaymentTables {
    transactions: HashMap<String, TransactionRecord>,
    subscriptions: HashMap<String, SubscriptionRecord>,
    transfers: HashMap<String, TransferRecord>,
    writes: u64,
}

/// In-memory transaction, subscription and transfer tables
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentRecords {
    tables: Arc<RwLock<PaymentTables>>,
}

impl InMemoryPaymentRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of successful write operations
    pub async fn write_count(&self) -> u64 {
        self.tables.read().await.writes
    }

    pub async fn transaction_count(&self) -> usize {
        self.tables.read().await.transactions.len()
    }

    pub async fn subscription_count(&self) -> usize {
        self.tables.read().await.subscriptions.len()
    }

    pub async fn transfer_count(&self) -> usize {
        self.tables.read().await.transfers.len()
    }
}

#[async_trait]
impl PaymentRecordStore for InMemoryPaymentRecords {
    async fn upsert_transaction(
        &self,
        reference: &str,
        changes: TransactionChanges,
    ) -> Result<TransactionRecord, StoreError> {
        let mut tables = self.tables.write().await;
        tables.writes += 1;
        let record = match tables.transactions.entry(reference.to_string()) {
            Entry::Occupied(mut row) => {
                row.get_mut().apply(changes);
                row.get().clone()
            }
            Entry::Vacant(slot) => slot
                .insert(TransactionRecord::create(reference, changes))
                .clone(),
        };
        Ok(record)
    }

    async fn get_transaction(
        &self,
        reference: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.tables.read().await.transactions.get(reference).cloned())
    }

    async fn upsert_subscription(
        &self,
        subscription_code: &str,
        changes: SubscriptionChanges,
    ) -> Result<SubscriptionRecord, StoreError> {
        let mut tables = self.tables.write().await;
        tables.writes += 1;
        let record = match tables.subscriptions.entry(subscription_code.to_string()) {
            Entry::Occupied(mut row) => {
                row.get_mut().apply(changes);
                row.get().clone()
            }
            Entry::Vacant(slot) => slot
                .insert(SubscriptionRecord::create(subscription_code, changes))
                .clone(),
        };
        Ok(record)
    }

    async fn update_subscription_status(
        &self,
        subscription_code: &str,
        status: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.subscriptions.get_mut(subscription_code) else {
            return Ok(false);
        };
        row.status = status.to_string();
        row.updated_at = Timestamp::now();
        tables.writes += 1;
        Ok(true)
    }

    async fn get_subscription(
        &self,
        subscription_code: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .subscriptions
            .get(subscription_code)
            .cloned())
    }

    async fn upsert_transfer(
        &self,
        transfer_code: &str,
        changes: TransferChanges,
    ) -> Result<TransferRecord, StoreError> {
        let mut tables = self.tables.write().await;
        tables.writes += 1;
        let record = match tables.transfers.entry(transfer_code.to_string()) {
            Entry::Occupied(mut row) => {
                row.get_mut().apply(changes);
                row.get().clone()
            }
            Entry::Vacant(slot) => slot
                .insert(TransferRecord::create(transfer_code, changes))
                .clone(),
        };
        Ok(record)
    }

    async fn update_transfer(
        &self,
        transfer_code: &str,
        status: &str,
        raw_response: Value,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.transfers.get_mut(transfer_code) else {
            return Ok(false);
        };
        row.status = status.to_string();
        row.raw_response = raw_response;
        row.updated_at = Timestamp::now();
        tables.writes += 1;
        Ok(true)
    }

    async fn get_transfer(&self, transfer_code: &str) -> Result<Option<TransferRecord>, StoreError> {
        Ok(self.tables.read().await.transfers.get(transfer_code).cloned())
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
