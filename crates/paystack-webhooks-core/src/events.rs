//! # Event Catalog
//!
//! The closed set of event types Paystack delivers and the typed view over
//! an event's `data` object.
//!
//! Unknown event type strings are still representable as an [`IncomingEvent`]
//! so the ingress can record them; they simply never resolve to an
//! [`EventKind`] and therefore never reach a handler.

use crate::{EventId, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Fields consulted, in order, when deriving an event identifier
const IDENTIFYING_FIELDS: [&str; 3] = ["id", "reference", "transfer_code"];

/// Length of the random suffix used when no identifying field is present
const RANDOM_SUFFIX_LEN: usize = 12;

/// Currency assumed when an event omits one
pub const DEFAULT_CURRENCY: &str = "NGN";

// ============================================================================
// Event Kinds
// ============================================================================

/// Every event type Paystack is documented to send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    ChargeSuccess,
    ChargeFailed,
    TransferSuccess,
    TransferFailed,
    TransferReversed,
    SubscriptionCreate,
    SubscriptionDisable,
    SubscriptionNotRenew,
    SubscriptionExpiringCards,
    InvoiceCreate,
    InvoiceUpdate,
    InvoicePaymentFailed,
    CustomerIdentificationSuccess,
    CustomerIdentificationFailed,
    RefundPending,
    RefundProcessed,
    RefundFailed,
    DisputeCreate,
    DisputeRemind,
    DisputeResolve,
    DedicatedAccountAssignSuccess,
    DedicatedAccountAssignFailed,
    PaymentRequestPending,
    PaymentRequestSuccess,
    ProductOrderPending,
    ProductOrderSuccess,
    TerminalLive,
    TerminalOffline,
}

impl EventKind {
    /// All recognised kinds, in catalog order
    pub const ALL: [EventKind; 28] = [
        Self::ChargeSuccess,
        Self::ChargeFailed,
        Self::TransferSuccess,
        Self::TransferFailed,
        Self::TransferReversed,
        Self::SubscriptionCreate,
        Self::SubscriptionDisable,
        Self::SubscriptionNotRenew,
        Self::SubscriptionExpiringCards,
        Self::InvoiceCreate,
        Self::InvoiceUpdate,
        Self::InvoicePaymentFailed,
        Self::CustomerIdentificationSuccess,
        Self::CustomerIdentificationFailed,
        Self::RefundPending,
        Self::RefundProcessed,
        Self::RefundFailed,
        Self::DisputeCreate,
        Self::DisputeRemind,
        Self::DisputeResolve,
        Self::DedicatedAccountAssignSuccess,
        Self::DedicatedAccountAssignFailed,
        Self::PaymentRequestPending,
        Self::PaymentRequestSuccess,
        Self::ProductOrderPending,
        Self::ProductOrderSuccess,
        Self::TerminalLive,
        Self::TerminalOffline,
    ];

    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChargeSuccess => "charge.success",
            Self::ChargeFailed => "charge.failed",
            Self::TransferSuccess => "transfer.success",
            Self::TransferFailed => "transfer.failed",
            Self::TransferReversed => "transfer.reversed",
            Self::SubscriptionCreate => "subscription.create",
            Self::SubscriptionDisable => "subscription.disable",
            Self::SubscriptionNotRenew => "subscription.not_renew",
            Self::SubscriptionExpiringCards => "subscription.expiring_cards",
            Self::InvoiceCreate => "invoice.create",
            Self::InvoiceUpdate => "invoice.update",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::CustomerIdentificationSuccess => "customeridentification.success",
            Self::CustomerIdentificationFailed => "customeridentification.failed",
            Self::RefundPending => "refund.pending",
            Self::RefundProcessed => "refund.processed",
            Self::RefundFailed => "refund.failed",
            Self::DisputeCreate => "dispute.create",
            Self::DisputeRemind => "dispute.remind",
            Self::DisputeResolve => "dispute.resolve",
            Self::DedicatedAccountAssignSuccess => "dedicatedaccount.assign.success",
            Self::DedicatedAccountAssignFailed => "dedicatedaccount.assign.failed",
            Self::PaymentRequestPending => "paymentrequest.pending",
            Self::PaymentRequestSuccess => "paymentrequest.success",
            Self::ProductOrderPending => "productorder.pending",
            Self::ProductOrderSuccess => "productorder.success",
            Self::TerminalLive => "terminal.live",
            Self::TerminalOffline => "terminal.offline",
        }
    }

    /// Resource family the event belongs to
    pub fn category(&self) -> EventCategory {
        match self {
            Self::ChargeSuccess | Self::ChargeFailed => EventCategory::Charge,
            Self::TransferSuccess | Self::TransferFailed | Self::TransferReversed => {
                EventCategory::Transfer
            }
            Self::SubscriptionCreate
            | Self::SubscriptionDisable
            | Self::SubscriptionNotRenew
            | Self::SubscriptionExpiringCards => EventCategory::Subscription,
            Self::InvoiceCreate | Self::InvoiceUpdate | Self::InvoicePaymentFailed => {
                EventCategory::Invoice
            }
            Self::CustomerIdentificationSuccess | Self::CustomerIdentificationFailed => {
                EventCategory::CustomerIdentification
            }
            Self::RefundPending | Self::RefundProcessed | Self::RefundFailed => {
                EventCategory::Refund
            }
            Self::DisputeCreate | Self::DisputeRemind | Self::DisputeResolve => {
                EventCategory::Dispute
            }
            Self::DedicatedAccountAssignSuccess | Self::DedicatedAccountAssignFailed => {
                EventCategory::DedicatedAccount
            }
            Self::PaymentRequestPending | Self::PaymentRequestSuccess => {
                EventCategory::PaymentRequest
            }
            Self::ProductOrderPending | Self::ProductOrderSuccess => EventCategory::ProductOrder,
            Self::TerminalLive | Self::TerminalOffline => EventCategory::Terminal,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "event".to_string(),
                message: format!("unknown event type '{}'", s),
            })
    }
}

/// Resource family of an event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Charge,
    Transfer,
    Subscription,
    Invoice,
    CustomerIdentification,
    Refund,
    Dispute,
    DedicatedAccount,
    PaymentRequest,
    ProductOrder,
    Terminal,
}

/// Check whether an event type string is part of the catalog
pub fn is_valid(event_type: &str) -> bool {
    EventKind::from_str(event_type).is_ok()
}

// ============================================================================
// Event Data
// ============================================================================

fn empty_map() -> &'static Map<String, Value> {
    static EMPTY: OnceLock<Map<String, Value>> = OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

/// Typed read-only view over the `data` object of an event
///
/// The named accessors return the conventional defaults when a field is
/// missing or has the wrong JSON type. The `opt_*` accessors return `None`
/// instead, for callers that must distinguish absent from empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventData(Map<String, Value>);

impl EventData {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> ValidationResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ValidationError::InvalidFormat {
                field: "data".to_string(),
                message: format!("expected a JSON object, got {}", json_type_name(&other)),
            }),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Clone the payload back into a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn reference(&self) -> &str {
        str_or(&self.0, "reference", "")
    }

    pub fn amount(&self) -> i64 {
        self.opt_i64("amount").unwrap_or(0)
    }

    pub fn currency(&self) -> &str {
        str_or(&self.0, "currency", DEFAULT_CURRENCY)
    }

    pub fn customer(&self) -> &Map<String, Value> {
        self.object_or_empty("customer")
    }

    pub fn customer_email(&self) -> &str {
        str_or(self.customer(), "email", "")
    }

    pub fn customer_code(&self) -> &str {
        str_or(self.customer(), "customer_code", "")
    }

    pub fn status(&self) -> &str {
        str_or(&self.0, "status", "")
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        self.object_or_empty("metadata")
    }

    /// String field, `None` when absent or null
    ///
    /// Numbers and booleans are rendered to their JSON text.
    pub fn opt_str(&self, key: &str) -> Option<String> {
        scalar_to_string(self.0.get(key)?)
    }

    /// Integer field, `None` when absent or not numeric
    ///
    /// Floats are truncated toward zero and numeric strings are parsed, the
    /// way an integer database column accepts them.
    pub fn opt_i64(&self, key: &str) -> Option<i64> {
        value_to_i64(self.0.get(key)?)
    }

    /// String field of a nested object such as `customer.email`
    pub fn nested_str(&self, parent: &str, key: &str) -> Option<String> {
        self.0
            .get(parent)
            .and_then(Value::as_object)
            .and_then(|object| object.get(key))
            .and_then(scalar_to_string)
    }

    /// Raw field value, `None` when absent or null
    pub fn opt_value(&self, key: &str) -> Option<Value> {
        match self.0.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        }
    }

    fn object_or_empty(&self, key: &str) -> &Map<String, Value> {
        self.0
            .get(key)
            .and_then(Value::as_object)
            .unwrap_or_else(|| empty_map())
    }
}

fn str_or<'a>(object: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    object.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            // Out-of-range and non-finite values are rejected, not saturated
            (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64)
                .then(|| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Incoming Event
// ============================================================================

/// A parsed webhook event with its derived identifier
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingEvent {
    pub event_type: String,
    pub data: EventData,
    pub event_id: EventId,
}

impl IncomingEvent {
    /// Build an event and derive its identifier
    ///
    /// The identifier is `"{event_type}_{value}"` where `value` is the first
    /// non-null of `id`, `reference` and `transfer_code`. Without any of
    /// those a random 12 character hex suffix is used, so such events are
    /// never detected as duplicates.
    pub fn new(event_type: impl Into<String>, data: EventData) -> Self {
        let event_type = event_type.into();
        let discriminator = IDENTIFYING_FIELDS
            .iter()
            .find_map(|field| data.opt_str(field))
            .unwrap_or_else(random_suffix);

        let event_id = EventId::from_parts(&event_type, &discriminator);
        Self {
            event_type,
            data,
            event_id,
        }
    }

    /// Build an event from an arbitrary JSON value for `data`
    pub fn from_value(event_type: impl Into<String>, data: Value) -> ValidationResult<Self> {
        Ok(Self::new(event_type, EventData::from_value(data)?))
    }

    /// Catalog entry for this event, `None` for unknown types
    pub fn kind(&self) -> Option<EventKind> {
        self.event_type.parse().ok()
    }
}

fn random_suffix() -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(RANDOM_SUFFIX_LEN);
    hex
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
