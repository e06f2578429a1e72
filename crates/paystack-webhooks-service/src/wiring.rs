//! Composition root: builds the dispatcher, stores and HTTP state from
//! configuration.

use crate::subscribers::LoggingSubscriber;
use paystack_webhooks_api::{
    AppState, ConfigError, PaystackConfig, ServiceConfig, ServiceError, ServiceMetrics,
    StorageBackend, PAYSTACK_WEBHOOK_IPS,
};
use paystack_webhooks_core::dedup::DEFAULT_CACHE_CAPACITY;
use paystack_webhooks_core::{
    DefaultHandler, EventDeduplicator, EventDispatcher, FilesystemWebhookEventStore,
    HandlerRegistry, HandlerSettings, InMemoryPaymentRecords, InMemoryWebhookEventStore,
    PaymentRecordStore, SignalBus, SignatureVerifier, WebhookEventStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Open the webhook receipt store
///
/// Receipts are only kept when model persistence is enabled.
pub async fn open_event_store(
    config: &PaystackConfig,
) -> Result<Option<Arc<dyn WebhookEventStore>>, ServiceError> {
    if !config.enable_models {
        info!("Model persistence disabled, webhook receipts will not be stored");
        return Ok(None);
    }

    let store: Arc<dyn WebhookEventStore> = match config.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory webhook event store");
            Arc::new(InMemoryWebhookEventStore::new())
        }
        StorageBackend::Filesystem => {
            let path = PathBuf::from(&config.storage_path);
            let store = FilesystemWebhookEventStore::new(path).await.map_err(|e| {
                ConfigError::Invalid {
                    message: format!(
                        "cannot open storage path '{}': {}",
                        config.storage_path, e
                    ),
                }
            })?;
            info!(path = %config.storage_path, "Using filesystem webhook event store");
            Arc::new(store)
        }
    };

    Ok(Some(store))
}

/// Build the dispatcher with the built-in handler registered for every
/// event kind that has a default action
pub fn build_dispatcher(
    settings: HandlerSettings,
    records: Arc<dyn PaymentRecordStore>,
    signals: Arc<SignalBus>,
    event_store: Option<Arc<dyn WebhookEventStore>>,
) -> Arc<EventDispatcher> {
    let handler = Arc::new(DefaultHandler::new(settings, records, signals));
    let registry = HandlerRegistry::with_defaults(handler);
    info!(handlers = registry.len(), "Registered default event handlers");

    let deduplicator = EventDeduplicator::new(DEFAULT_CACHE_CAPACITY, event_store);
    Arc::new(EventDispatcher::new(registry, deduplicator))
}

/// Build the complete HTTP state from validated configuration
pub async fn build_state(config: ServiceConfig) -> Result<AppState, ServiceError> {
    report_allowlist(&config.webhooks.allowed_ips);

    let event_store = open_event_store(&config.paystack).await?;

    let signals = Arc::new(SignalBus::new());
    signals.subscribe(Arc::new(LoggingSubscriber::new()));

    let records = Arc::new(InMemoryPaymentRecords::new());
    let dispatcher = build_dispatcher(
        config.handler_settings(),
        records,
        signals,
        event_store.clone(),
    );

    let verifier = SignatureVerifier::new(
        config.paystack.webhook_secret.clone(),
        config.signature_mode(),
    );
    let metrics = ServiceMetrics::new().map_err(|e| ConfigError::Invalid {
        message: format!("cannot register metrics: {}", e),
    })?;

    Ok(AppState::new(
        config,
        verifier,
        dispatcher,
        event_store,
        metrics,
    ))
}

fn report_allowlist(allowed_ips: &[String]) {
    if allowed_ips.is_empty() {
        info!("IP allowlist disabled, accepting webhooks from any address");
        return;
    }

    info!(count = allowed_ips.len(), "IP allowlist enabled");
    for ip in allowed_ips {
        if !PAYSTACK_WEBHOOK_IPS.contains(&ip.as_str()) {
            warn!(ip = %ip, "Allowlisted address is not a published Paystack webhook source");
        }
    }
}

#[cfg(test)]
#[path = "wiring_tests.rs"]
mod tests;
