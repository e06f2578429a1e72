//! Signal subscribers installed by the service.

use async_trait::async_trait;
use paystack_webhooks_core::signals::SubscriberError;
use paystack_webhooks_core::{Signal, SignalSubscriber};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Natural keys checked, in order, to identify the object behind a signal
const KEY_FIELDS: [&str; 4] = ["reference", "subscription_code", "transfer_code", "id"];

/// Logs every published signal
#[derive(Debug, Default)]
pub struct LoggingSubscriber;

impl LoggingSubscriber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignalSubscriber for LoggingSubscriber {
    async fn receive(&self, signal: Signal, payload: Arc<Value>) -> Result<(), SubscriberError> {
        info!(
            signal = %signal,
            payload_key = signal.payload_key(),
            key = %payload_key_value(&payload).unwrap_or_default(),
            "Paystack signal published"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}

fn payload_key_value(payload: &Value) -> Option<String> {
    KEY_FIELDS
        .iter()
        .filter_map(|field| payload.get(field))
        .find_map(|value| match value {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
}

#[cfg(test)]
#[path = "subscribers_tests.rs"]
mod tests;
