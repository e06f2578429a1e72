//! # Signals
//!
//! Named notifications the built-in handlers publish after a payment, a
//! subscription or a transfer changes state. Applications subscribe to react
//! to them (send receipts, provision accounts, ...).
//!
//! Publishing awaits every subscriber in registration order. A subscriber
//! that fails or panics is logged and skipped; it never aborts the handler
//! that published the signal.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, warn};

/// Boxed error returned by subscribers
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Notification published by the built-in handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    PaymentSuccessful,
    PaymentFailed,
    SubscriptionCreated,
    SubscriptionCancelled,
    TransferSuccessful,
    TransferFailed,
    RefundProcessed,
    DisputeCreated,
    DisputeResolved,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PaymentSuccessful => "payment_successful",
            Self::PaymentFailed => "payment_failed",
            Self::SubscriptionCreated => "subscription_created",
            Self::SubscriptionCancelled => "subscription_cancelled",
            Self::TransferSuccessful => "transfer_successful",
            Self::TransferFailed => "transfer_failed",
            Self::RefundProcessed => "refund_processed",
            Self::DisputeCreated => "dispute_created",
            Self::DisputeResolved => "dispute_resolved",
        }
    }

    /// Name under which subscribers conventionally receive the payload
    pub fn payload_key(&self) -> &'static str {
        match self {
            Self::PaymentSuccessful | Self::PaymentFailed => "transaction_data",
            Self::SubscriptionCreated | Self::SubscriptionCancelled => "subscription_data",
            Self::TransferSuccessful | Self::TransferFailed => "transfer_data",
            Self::RefundProcessed => "refund_data",
            Self::DisputeCreated | Self::DisputeResolved => "dispute_data",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receiver of published signals
#[async_trait]
pub trait SignalSubscriber: Send + Sync + 'static {
    /// Handle one signal; `payload` is the raw event data
    async fn receive(&self, signal: Signal, payload: Arc<Value>) -> Result<(), SubscriberError>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Delivery counts for one published signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Fan-out of signals to registered subscribers
#[derive(Default)]
pub struct SignalBus {
    subscribers: RwLock<Vec<Arc<dyn SignalSubscriber>>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn SignalSubscriber>) {
        debug!(subscriber = subscriber.name(), "Registered signal subscriber");
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Deliver `signal` to every subscriber, one after another
    pub async fn publish(&self, signal: Signal, payload: Value) -> PublishSummary {
        let subscribers = self.snapshot();
        let payload = Arc::new(payload);
        let mut summary = PublishSummary::default();

        for subscriber in subscribers {
            let name = subscriber.name().to_string();
            let task_payload = Arc::clone(&payload);

            // Running each delivery as its own task contains subscriber panics
            let delivery =
                tokio::spawn(async move { subscriber.receive(signal, task_payload).await });

            match delivery.await {
                Ok(Ok(())) => summary.delivered += 1,
                Ok(Err(e)) => {
                    summary.failed += 1;
                    warn!(
                        signal = %signal,
                        subscriber = %name,
                        error = %e,
                        "Signal subscriber failed"
                    );
                }
                Err(join_error) => {
                    summary.failed += 1;
                    error!(
                        signal = %signal,
                        subscriber = %name,
                        error = %join_error,
                        "Signal subscriber panicked"
                    );
                }
            }
        }

        debug!(
            signal = %signal,
            delivered = summary.delivered,
            failed = summary.failed,
            "Published signal"
        );
        summary
    }

    fn snapshot(&self) -> Vec<Arc<dyn SignalSubscriber>> {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
