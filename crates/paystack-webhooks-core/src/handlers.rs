//! # Built-in Handlers
//!
//! Default behaviour for the event kinds that affect local state. Each action
//! has up to two independent side effects, toggled by [`HandlerSettings`]:
//!
//! - persistence: create or update a transaction, subscription or transfer
//!   row keyed by its natural code
//! - notification: publish a [`Signal`] carrying the raw event data
//!
//! Events missing their natural code skip persistence but still publish.

use crate::dispatcher::{EventHandler, HandlerError};
use crate::events::{EventData, EventKind, IncomingEvent};
use crate::records::{
    ChargeSettlement, PaymentRecordStore, SubscriptionChanges, TransactionChanges, TransferChanges,
};
use crate::signals::{Signal, SignalBus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which side effects the built-in handlers perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerSettings {
    pub enable_models: bool,
    pub enable_signals: bool,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            enable_models: true,
            enable_signals: true,
        }
    }
}

/// Built-in reaction to an event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAction {
    ChargeSucceeded,
    ChargeFailed,
    SubscriptionCreated,
    SubscriptionDisabled,
    SubscriptionNotRenewing,
    TransferSucceeded,
    TransferFailed,
    TransferReversed,
    RefundProcessed,
    DisputeCreated,
    DisputeResolved,
    DedicatedAccountAssigned,
    InvoiceCreated,
    InvoicePaymentFailed,
}

impl DefaultAction {
    /// Built-in action for `kind`, `None` when the kind has no default
    pub fn for_kind(kind: EventKind) -> Option<Self> {
        let action = match kind {
            EventKind::ChargeSuccess => Self::ChargeSucceeded,
            EventKind::ChargeFailed => Self::ChargeFailed,
            EventKind::SubscriptionCreate => Self::SubscriptionCreated,
            EventKind::SubscriptionDisable => Self::SubscriptionDisabled,
            EventKind::SubscriptionNotRenew => Self::SubscriptionNotRenewing,
            EventKind::TransferSuccess => Self::TransferSucceeded,
            EventKind::TransferFailed => Self::TransferFailed,
            EventKind::TransferReversed => Self::TransferReversed,
            EventKind::RefundProcessed => Self::RefundProcessed,
            EventKind::DisputeCreate => Self::DisputeCreated,
            EventKind::DisputeResolve => Self::DisputeResolved,
            EventKind::DedicatedAccountAssignSuccess => Self::DedicatedAccountAssigned,
            EventKind::InvoiceCreate => Self::InvoiceCreated,
            EventKind::InvoicePaymentFailed => Self::InvoicePaymentFailed,
            _ => return None,
        };
        Some(action)
    }

    /// Signal published after the action, if any
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Self::ChargeSucceeded => Some(Signal::PaymentSuccessful),
            Self::ChargeFailed => Some(Signal::PaymentFailed),
            Self::SubscriptionCreated => Some(Signal::SubscriptionCreated),
            Self::SubscriptionDisabled => Some(Signal::SubscriptionCancelled),
            Self::TransferSucceeded => Some(Signal::TransferSuccessful),
            Self::TransferFailed => Some(Signal::TransferFailed),
            Self::RefundProcessed => Some(Signal::RefundProcessed),
            Self::DisputeCreated => Some(Signal::DisputeCreated),
            Self::DisputeResolved => Some(Signal::DisputeResolved),
            Self::SubscriptionNotRenewing
            | Self::TransferReversed
            | Self::DedicatedAccountAssigned
            | Self::InvoiceCreated
            | Self::InvoicePaymentFailed => None,
        }
    }
}

/// Handler applying [`DefaultAction`]s against a record store and signal bus
pub struct DefaultHandler {
    settings: HandlerSettings,
    records: Arc<dyn PaymentRecordStore>,
    signals: Arc<SignalBus>,
}

impl DefaultHandler {
    pub fn new(
        settings: HandlerSettings,
        records: Arc<dyn PaymentRecordStore>,
        signals: Arc<SignalBus>,
    ) -> Self {
        Self {
            settings,
            records,
            signals,
        }
    }

    pub fn settings(&self) -> HandlerSettings {
        self.settings
    }

    /// Run `action` for `data`
    pub async fn apply(&self, action: DefaultAction, data: &EventData) -> Result<(), HandlerError> {
        if self.settings.enable_models {
            self.persist(action, data).await?;
        }

        match action {
            DefaultAction::DedicatedAccountAssigned => {
                info!(
                    account_number = %data.opt_str("account_number").unwrap_or_default(),
                    "Dedicated account assigned"
                );
            }
            DefaultAction::InvoiceCreated => {
                info!(reference = %data.reference(), "Invoice created");
            }
            DefaultAction::InvoicePaymentFailed => {
                warn!(reference = %data.reference(), "Invoice payment failed");
            }
            _ => {}
        }

        if self.settings.enable_signals {
            if let Some(signal) = action.signal() {
                self.signals.publish(signal, data.to_value()).await;
            }
        }

        Ok(())
    }

    async fn persist(&self, action: DefaultAction, data: &EventData) -> Result<(), HandlerError> {
        match action {
            DefaultAction::ChargeSucceeded | DefaultAction::ChargeFailed => {
                let Some(reference) = natural_key(data, "reference") else {
                    return Ok(());
                };
                let changes = transaction_changes(data, action == DefaultAction::ChargeSucceeded);
                self.records.upsert_transaction(&reference, changes).await?;
            }
            DefaultAction::SubscriptionCreated => {
                let Some(code) = natural_key(data, "subscription_code") else {
                    return Ok(());
                };
                self.records
                    .upsert_subscription(&code, subscription_changes(data))
                    .await?;
            }
            DefaultAction::SubscriptionDisabled | DefaultAction::SubscriptionNotRenewing => {
                let Some(code) = natural_key(data, "subscription_code") else {
                    return Ok(());
                };
                let status = if action == DefaultAction::SubscriptionDisabled {
                    "cancelled"
                } else {
                    "non-renewing"
                };
                let updated = self.records.update_subscription_status(&code, status).await?;
                if !updated {
                    debug!(subscription_code = %code, "No subscription row to update");
                }
            }
            DefaultAction::TransferSucceeded | DefaultAction::TransferFailed => {
                let Some(code) = natural_key(data, "transfer_code") else {
                    return Ok(());
                };
                let changes = transfer_changes(data, action == DefaultAction::TransferSucceeded);
                self.records.upsert_transfer(&code, changes).await?;
            }
            DefaultAction::TransferReversed => {
                let Some(code) = natural_key(data, "transfer_code") else {
                    return Ok(());
                };
                let updated = self
                    .records
                    .update_transfer(&code, "failed", data.to_value())
                    .await?;
                if !updated {
                    debug!(transfer_code = %code, "No transfer row to update");
                }
            }
            DefaultAction::RefundProcessed
            | DefaultAction::DisputeCreated
            | DefaultAction::DisputeResolved
            | DefaultAction::DedicatedAccountAssigned
            | DefaultAction::InvoiceCreated
            | DefaultAction::InvoicePaymentFailed => {}
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for DefaultHandler {
    async fn handle(&self, kind: EventKind, event: &IncomingEvent) -> Result<(), HandlerError> {
        match DefaultAction::for_kind(kind) {
            Some(action) => self.apply(action, &event.data).await,
            None => {
                debug!(event_type = %kind, "No built-in action for event type");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for DefaultHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHandler")
            .field("settings", &self.settings)
            .field("signals", &self.signals)
            .finish()
    }
}

fn natural_key(data: &EventData, field: &str) -> Option<String> {
    data.opt_str(field).filter(|value| !value.is_empty())
}

fn transaction_changes(data: &EventData, succeeded: bool) -> TransactionChanges {
    let settlement = succeeded.then(|| ChargeSettlement {
        authorization_code: data.nested_str("authorization", "authorization_code"),
        channel: data.opt_str("channel"),
        fees: data.opt_i64("fees"),
        paid_at: data.opt_str("paid_at"),
    });

    TransactionChanges {
        amount: data.opt_i64("amount"),
        currency: data.currency().to_string(),
        status: if succeeded { "success" } else { "failed" }.to_string(),
        customer_email: data.nested_str("customer", "email"),
        customer_code: data.nested_str("customer", "customer_code"),
        metadata: data.opt_value("metadata"),
        raw_response: data.to_value(),
        settlement,
    }
}

fn subscription_changes(data: &EventData) -> SubscriptionChanges {
    SubscriptionChanges {
        customer_code: data.nested_str("customer", "customer_code"),
        plan_code: data.nested_str("plan", "plan_code"),
        amount: data.opt_i64("amount"),
        status: data.opt_str("status").unwrap_or_else(|| "active".to_string()),
        next_payment_date: data.opt_str("next_payment_date"),
        authorization_code: data.nested_str("authorization", "authorization_code"),
        metadata: data.opt_value("metadata"),
        raw_response: data.to_value(),
    }
}

fn transfer_changes(data: &EventData, succeeded: bool) -> TransferChanges {
    TransferChanges {
        reference: data.opt_str("reference"),
        amount: data.opt_i64("amount"),
        currency: data.currency().to_string(),
        status: if succeeded { "success" } else { "failed" }.to_string(),
        recipient_code: data.nested_str("recipient", "recipient_code"),
        reason: data.opt_str("reason"),
        transferred_at: succeeded.then(|| data.opt_str("transferred_at")),
        metadata: data.opt_value("metadata"),
        raw_response: data.to_value(),
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
