//! # Payment Records
//!
//! The transaction, subscription and transfer rows that the built-in handlers
//! keep in sync with Paystack events. Rows are keyed by their natural code
//! (`reference`, `subscription_code`, `transfer_code`).
//!
//! Upserts follow create-or-update semantics: on create every field comes
//! from the change set, on update only the fields the change set carries are
//! overwritten and the rest of the row is preserved.

use crate::store::StoreError;
use crate::Timestamp;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Transactions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub reference: String,
    pub amount: Option<i64>,
    pub currency: String,
    pub status: String,
    pub customer_email: Option<String>,
    pub customer_code: Option<String>,
    pub authorization_code: Option<String>,
    pub channel: Option<String>,
    pub fees: Option<i64>,
    pub paid_at: Option<String>,
    pub metadata: Option<Value>,
    pub raw_response: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Settlement details only a successful charge carries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChargeSettlement {
    pub authorization_code: Option<String>,
    pub channel: Option<String>,
    pub fees: Option<i64>,
    pub paid_at: Option<String>,
}

/// Field values written by a charge event
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionChanges {
    pub amount: Option<i64>,
    pub currency: String,
    pub status: String,
    pub customer_email: Option<String>,
    pub customer_code: Option<String>,
    pub metadata: Option<Value>,
    pub raw_response: Value,
    /// Left untouched on update when `None`
    pub settlement: Option<ChargeSettlement>,
}

impl TransactionRecord {
    pub fn create(reference: &str, changes: TransactionChanges) -> Self {
        let now = Timestamp::now();
        let settlement = changes.settlement.unwrap_or_default();
        Self {
            reference: reference.to_string(),
            amount: changes.amount,
            currency: changes.currency,
            status: changes.status,
            customer_email: changes.customer_email,
            customer_code: changes.customer_code,
            authorization_code: settlement.authorization_code,
            channel: settlement.channel,
            fees: settlement.fees,
            paid_at: settlement.paid_at,
            metadata: changes.metadata,
            raw_response: changes.raw_response,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: TransactionChanges) {
        self.amount = changes.amount;
        self.currency = changes.currency;
        self.status = changes.status;
        self.customer_email = changes.customer_email;
        self.customer_code = changes.customer_code;
        self.metadata = changes.metadata;
        self.raw_response = changes.raw_response;
        if let Some(settlement) = changes.settlement {
            self.authorization_code = settlement.authorization_code;
            self.channel = settlement.channel;
            self.fees = settlement.fees;
            self.paid_at = settlement.paid_at;
        }
        self.updated_at = Timestamp::now();
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub subscription_code: String,
    pub customer_code: Option<String>,
    pub plan_code: Option<String>,
    pub amount: Option<i64>,
    pub status: String,
    pub next_payment_date: Option<String>,
    pub authorization_code: Option<String>,
    pub metadata: Option<Value>,
    pub raw_response: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionChanges {
    pub customer_code: Option<String>,
    pub plan_code: Option<String>,
    pub amount: Option<i64>,
    pub status: String,
    pub next_payment_date: Option<String>,
    pub authorization_code: Option<String>,
    pub metadata: Option<Value>,
    pub raw_response: Value,
}

impl SubscriptionRecord {
    pub fn create(subscription_code: &str, changes: SubscriptionChanges) -> Self {
        let now = Timestamp::now();
        Self {
            subscription_code: subscription_code.to_string(),
            customer_code: changes.customer_code,
            plan_code: changes.plan_code,
            amount: changes.amount,
            status: changes.status,
            next_payment_date: changes.next_payment_date,
            authorization_code: changes.authorization_code,
            metadata: changes.metadata,
            raw_response: changes.raw_response,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: SubscriptionChanges) {
        self.customer_code = changes.customer_code;
        self.plan_code = changes.plan_code;
        self.amount = changes.amount;
        self.status = changes.status;
        self.next_payment_date = changes.next_payment_date;
        self.authorization_code = changes.authorization_code;
        self.metadata = changes.metadata;
        self.raw_response = changes.raw_response;
        self.updated_at = Timestamp::now();
    }
}

// ============================================================================
// Transfers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub transfer_code: String,
    pub reference: Option<String>,
    pub amount: Option<i64>,
    pub currency: String,
    pub status: String,
    pub recipient_code: Option<String>,
    pub reason: Option<String>,
    pub transferred_at: Option<String>,
    pub metadata: Option<Value>,
    pub raw_response: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferChanges {
    pub reference: Option<String>,
    pub amount: Option<i64>,
    pub currency: String,
    pub status: String,
    pub recipient_code: Option<String>,
    pub reason: Option<String>,
    /// Outer `None` leaves the stored value untouched on update
    pub transferred_at: Option<Option<String>>,
    pub metadata: Option<Value>,
    pub raw_response: Value,
}

impl TransferRecord {
    pub fn create(transfer_code: &str, changes: TransferChanges) -> Self {
        let now = Timestamp::now();
        Self {
            transfer_code: transfer_code.to_string(),
            reference: changes.reference,
            amount: changes.amount,
            currency: changes.currency,
            status: changes.status,
            recipient_code: changes.recipient_code,
            reason: changes.reason,
            transferred_at: changes.transferred_at.flatten(),
            metadata: changes.metadata,
            raw_response: changes.raw_response,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: TransferChanges) {
        self.reference = changes.reference;
        self.amount = changes.amount;
        self.currency = changes.currency;
        self.status = changes.status;
        self.recipient_code = changes.recipient_code;
        self.reason = changes.reason;
        if let Some(transferred_at) = changes.transferred_at {
            self.transferred_at = transferred_at;
        }
        self.metadata = changes.metadata;
        self.raw_response = changes.raw_response;
        self.updated_at = Timestamp::now();
    }
}

// ============================================================================
// Store
// ============================================================================

/// Persistence for the records written by event handlers
///
/// Every operation touches exactly one row identified by its natural code.
/// The `update_*` operations return `false` without error when no row
/// exists.
#[async_trait]
pub trait PaymentRecordStore: Send + Sync {
    async fn upsert_transaction(
        &self,
        reference: &str,
        changes: TransactionChanges,
    ) -> Result<TransactionRecord, StoreError>;

    async fn get_transaction(&self, reference: &str)
        -> Result<Option<TransactionRecord>, StoreError>;

    async fn upsert_subscription(
        &self,
        subscription_code: &str,
        changes: SubscriptionChanges,
    ) -> Result<SubscriptionRecord, StoreError>;

    async fn update_subscription_status(
        &self,
        subscription_code: &str,
        status: &str,
    ) -> Result<bool, StoreError>;

    async fn get_subscription(
        &self,
        subscription_code: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    async fn upsert_transfer(
        &self,
        transfer_code: &str,
        changes: TransferChanges,
    ) -> Result<TransferRecord, StoreError>;

    /// Set status and replace the raw payload of an existing transfer
    async fn update_transfer(
        &self,
        transfer_code: &str,
        status: &str,
        raw_response: Value,
    ) -> Result<bool, StoreError>;

    async fn get_transfer(&self, transfer_code: &str) -> Result<Option<TransferRecord>, StoreError>;
}
