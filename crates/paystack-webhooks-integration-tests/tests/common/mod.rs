//! Common test utilities for the webhook service integration tests
//!
//! This module provides:
//! - A [`TestApp`] wiring the real router, dispatcher and stores
//! - Handler and subscriber doubles
//! - Signed request builders

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use paystack_webhooks_api::{create_router, AppState, ServiceConfig, ServiceMetrics};
use paystack_webhooks_core::{
    signals::SubscriberError, signature::compute_signature, DefaultHandler, EventDeduplicator,
    EventDispatcher, EventHandler, EventKind, HandlerError, HandlerRegistry, HandlerSettings,
    IncomingEvent, InMemoryPaymentRecords, InMemoryWebhookEventStore, SecretValue, Signal,
    SignalBus, SignalSubscriber, SignatureVerifier, WebhookEventStore,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const ENDPOINT: &str = "/paystack/webhook";

// ============================================================================
// Test application
// ============================================================================

/// Router plus handles on everything it writes to
pub struct TestApp {
    pub state: AppState,
    pub event_store: Arc<dyn WebhookEventStore>,
    pub records: Arc<InMemoryPaymentRecords>,
    pub signals: Arc<SignalRecorder>,
}

impl TestApp {
    /// Built-in handlers over an in-memory receipt store
    pub fn new() -> Self {
        Self::with_event_store(Arc::new(InMemoryWebhookEventStore::new()))
    }

    /// Built-in handlers over the given receipt store
    pub fn with_event_store(event_store: Arc<dyn WebhookEventStore>) -> Self {
        let records = Arc::new(InMemoryPaymentRecords::new());
        let signals = Arc::new(SignalRecorder::default());
        let bus = Arc::new(SignalBus::new());
        bus.subscribe(signals.clone());

        let handler = Arc::new(DefaultHandler::new(
            HandlerSettings::default(),
            records.clone(),
            bus,
        ));
        let registry = HandlerRegistry::with_defaults(handler);

        Self::build(registry, event_store, records, signals)
    }

    /// Built-in `charge.success` handling that stalls for `delay` first
    pub fn with_slow_charge_handler(
        event_store: Arc<dyn WebhookEventStore>,
        delay: Duration,
    ) -> (Self, Arc<DelayedHandler>) {
        let records = Arc::new(InMemoryPaymentRecords::new());
        let signals = Arc::new(SignalRecorder::default());
        let bus = Arc::new(SignalBus::new());
        bus.subscribe(signals.clone());

        let handler = Arc::new(DelayedHandler {
            inner: Arc::new(DefaultHandler::new(
                HandlerSettings::default(),
                records.clone(),
                bus,
            )),
            delay,
            calls: AtomicUsize::new(0),
        });
        let mut registry = HandlerRegistry::new();
        registry.register(EventKind::ChargeSuccess, handler.clone());

        (Self::build(registry, event_store, records, signals), handler)
    }

    /// A single custom handler for `kind`
    pub fn with_handler(kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        let mut registry = HandlerRegistry::new();
        registry.register(kind, handler);

        Self::build(
            registry,
            Arc::new(InMemoryWebhookEventStore::new()),
            Arc::new(InMemoryPaymentRecords::new()),
            Arc::new(SignalRecorder::default()),
        )
    }

    fn build(
        registry: HandlerRegistry,
        event_store: Arc<dyn WebhookEventStore>,
        records: Arc<InMemoryPaymentRecords>,
        signals: Arc<SignalRecorder>,
    ) -> Self {
        let config = test_config();
        let verifier = SignatureVerifier::new(
            config.paystack.webhook_secret.clone(),
            config.signature_mode(),
        );
        let dispatcher = Arc::new(EventDispatcher::new(
            registry,
            EventDeduplicator::new(1000, Some(event_store.clone())),
        ));
        let state = AppState::new(
            config,
            verifier,
            dispatcher,
            Some(event_store.clone()),
            ServiceMetrics::new().unwrap(),
        );

        Self {
            state,
            event_store,
            records,
            signals,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Send a request and decode the JSON response body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Sign and post a webhook payload
    pub async fn post_signed(&self, payload: &Value) -> (StatusCode, Value) {
        self.send(signed_request(payload)).await
    }
}

pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.paystack.secret_key = SecretValue::from("sk_test_integration");
    config.paystack.webhook_secret = SecretValue::from(WEBHOOK_SECRET);
    config.paystack.strict_signatures = true;
    config
}

// ============================================================================
// Request builders
// ============================================================================

pub fn signed_request(payload: &Value) -> Request<Body> {
    let body = serde_json::to_vec(payload).unwrap();
    let signature = compute_signature(&body, WEBHOOK_SECRET.as_bytes());

    Request::post(ENDPOINT)
        .header("content-type", "application/json")
        .header("x-paystack-signature", signature)
        .body(Body::from(body))
        .unwrap()
}

pub fn unsigned_request(payload: &Value) -> Request<Body> {
    Request::post(ENDPOINT)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

// ============================================================================
// Doubles
// ============================================================================

/// Handler that always fails with a fixed message
pub struct FailingHandler {
    pub message: &'static str,
}

#[async_trait]
impl EventHandler for FailingHandler {
    async fn handle(&self, _kind: EventKind, _event: &IncomingEvent) -> Result<(), HandlerError> {
        Err(self.message.into())
    }
}

/// Handler that sleeps before delegating, counting every call
pub struct DelayedHandler {
    pub inner: Arc<dyn EventHandler>,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl DelayedHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for DelayedHandler {
    async fn handle(&self, kind: EventKind, event: &IncomingEvent) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.handle(kind, event).await
    }
}

/// Subscriber remembering every signal it receives
#[derive(Default)]
pub struct SignalRecorder {
    received: Mutex<Vec<(Signal, Value)>>,
}

impl SignalRecorder {
    pub fn signals(&self) -> Vec<Signal> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|(signal, _)| *signal)
            .collect()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl SignalSubscriber for SignalRecorder {
    async fn receive(&self, signal: Signal, payload: Arc<Value>) -> Result<(), SubscriberError> {
        self.received
            .lock()
            .unwrap()
            .push((signal, payload.as_ref().clone()));
        Ok(())
    }
}
