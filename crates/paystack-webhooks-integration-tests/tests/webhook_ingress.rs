//! End-to-end tests for the webhook endpoint
//!
//! Requests go through the full router: signature check, payload parse,
//! receipt storage, dispatch and response mapping.

mod common;

use axum::http::StatusCode;
use common::{signed_request, unsigned_request, FailingHandler, TestApp};
use paystack_webhooks_core::{EventId, EventKind, InMemoryWebhookEventStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn charge_success(reference: &str) -> serde_json::Value {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": 250000,
            "currency": "NGN",
            "status": "success",
            "channel": "card",
            "customer": { "email": "ada@example.com", "customer_code": "CUS_ada" },
            "authorization": { "authorization_code": "AUTH_abc" }
        }
    })
}

#[tokio::test]
async fn test_signed_charge_is_accepted_and_marked_processed() {
    let app = TestApp::new();

    let (status, body) = app.post_signed(&charge_success("ref_e2e_1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success" }));

    let id = EventId::new("charge.success_ref_e2e_1").unwrap();
    let record = app.event_store.get(&id).await.unwrap().unwrap();
    assert!(record.processed);
    assert_eq!(record.processing_error, None);
    assert_eq!(record.raw_payload["event"], "charge.success");
}

#[tokio::test]
async fn test_missing_signature_stores_nothing() {
    let app = TestApp::new();

    let (status, body) = app.send(unsigned_request(&charge_success("ref_e2e_2"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Missing signature");

    let id = EventId::new("charge.success_ref_e2e_2").unwrap();
    assert!(app.event_store.get(&id).await.unwrap().is_none());
    assert_eq!(app.records.write_count().await, 0);
}

#[tokio::test]
async fn test_tampered_body_is_rejected() {
    let app = TestApp::new();
    let mut request = signed_request(&charge_success("ref_e2e_3"));
    *request.body_mut() = axum::body::Body::from(
        serde_json::to_vec(&charge_success("ref_e2e_other")).unwrap(),
    );

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid signature");
    assert_eq!(app.records.write_count().await, 0);
}

#[tokio::test]
async fn test_failing_handler_returns_500_and_keeps_error() {
    let app = TestApp::with_handler(
        EventKind::ChargeSuccess,
        Arc::new(FailingHandler {
            message: "payment ledger offline",
        }),
    );

    let (status, body) = app.post_signed(&charge_success("ref_e2e_4")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("payment ledger offline"));

    let id = EventId::new("charge.success_ref_e2e_4").unwrap();
    let record = app.event_store.get(&id).await.unwrap().unwrap();
    assert!(!record.processed);
    assert!(record
        .processing_error
        .unwrap()
        .contains("payment ledger offline"));
}

#[tokio::test]
async fn test_duplicate_delivery_answers_success_without_rework() {
    let app = TestApp::new();
    let payload = charge_success("ref_e2e_5");

    let (first, _) = app.post_signed(&payload).await;
    let (second, body) = app.post_signed(&payload).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success" }));
    assert_eq!(app.records.write_count().await, 1);
    assert_eq!(app.signals.signals().len(), 1);
}

#[tokio::test]
async fn test_overlapping_deliveries_write_and_signal_once() {
    let (app, handler) = TestApp::with_slow_charge_handler(
        Arc::new(InMemoryWebhookEventStore::new()),
        Duration::from_millis(200),
    );
    let payload = charge_success("ref_e2e_overlap");

    let second = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        app.post_signed(&payload).await
    };
    let ((first, _), (second, body)) = tokio::join!(app.post_signed(&payload), second);

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success" }));
    assert_eq!(handler.calls(), 1);
    assert_eq!(app.records.write_count().await, 1);
    assert_eq!(app.signals.signals().len(), 1);
    assert_eq!(app.state.metrics.duplicates_total.get(), 1);
}

#[tokio::test]
async fn test_unknown_event_type_is_acknowledged_without_effects() {
    let app = TestApp::new();
    let payload = json!({ "event": "paymentrequest.pending", "data": { "id": 7 } });

    let (status, body) = app.post_signed(&payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(app.records.write_count().await, 0);
    assert!(app.signals.signals().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app.post_signed(&json!({ "data": { "reference": "x" } })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing event type");
}

#[tokio::test]
async fn test_metrics_reflect_traffic() {
    let app = TestApp::new();
    app.post_signed(&charge_success("ref_e2e_6")).await;
    app.post_signed(&charge_success("ref_e2e_6")).await;
    app.send(unsigned_request(&charge_success("ref_e2e_7"))).await;

    let metrics = &app.state.metrics;
    assert_eq!(metrics.webhooks_received_total.get(), 3);
    assert_eq!(metrics.duplicates_total.get(), 1);
    assert_eq!(metrics.signature_failures_total.get(), 1);
}
