//! Integration tests for deduplication backed by the filesystem store
//!
//! A fresh [`TestApp`] over the same directory stands in for a restarted
//! process: its in-memory cache is empty, so duplicates can only be
//! recognised from the stored receipts.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use paystack_webhooks_core::{
    DispatchOutcome, EventData, EventDeduplicator, EventDispatcher, EventId,
    FilesystemWebhookEventStore, HandlerRegistry, StoredWebhookRecord, WebhookEventStore,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn charge_success(reference: &str) -> serde_json::Value {
    json!({
        "event": "charge.success",
        "data": { "reference": reference, "amount": 1200 }
    })
}

async fn filesystem_store(dir: &tempfile::TempDir) -> Arc<dyn WebhookEventStore> {
    Arc::new(
        FilesystemWebhookEventStore::new(dir.path().to_path_buf())
            .await
            .unwrap(),
    )
}

#[tokio::test]
async fn test_restart_does_not_reprocess_event() {
    let dir = tempfile::tempdir().unwrap();

    let before = TestApp::with_event_store(filesystem_store(&dir).await);
    let (status, _) = before.post_signed(&charge_success("ref_durable_1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before.records.write_count().await, 1);

    let after = TestApp::with_event_store(filesystem_store(&dir).await);
    let (status, body) = after.post_signed(&charge_success("ref_durable_1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(after.records.write_count().await, 0);
    assert!(after.signals.signals().is_empty());
    assert_eq!(after.state.metrics.duplicates_total.get(), 1);
}

#[tokio::test]
async fn test_failed_event_is_retried_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = filesystem_store(&dir).await;

    let id = EventId::new("charge.success_ref_durable_2").unwrap();
    store
        .insert(StoredWebhookRecord::new(
            "charge.success",
            id.clone(),
            charge_success("ref_durable_2"),
        ))
        .await
        .unwrap();
    store.record_failure(&id, "database is locked").await.unwrap();

    let app = TestApp::with_event_store(filesystem_store(&dir).await);
    let (status, _) = app.post_signed(&charge_success("ref_durable_2")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.records.write_count().await, 1);

    let record = store.get(&id).await.unwrap().unwrap();
    assert!(record.processed);
    assert_eq!(record.processing_error, None);
}

#[tokio::test]
async fn test_dispatcher_consults_store_on_cold_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store = filesystem_store(&dir).await;

    let id = EventId::new("charge.success_ref_durable_3").unwrap();
    store
        .insert(StoredWebhookRecord::new(
            "charge.success",
            id.clone(),
            json!({}),
        ))
        .await
        .unwrap();
    store.mark_processed(&id).await.unwrap();

    let dispatcher = EventDispatcher::new(
        HandlerRegistry::new(),
        EventDeduplicator::new(1000, Some(store)),
    );
    let data = EventData::from_value(json!({ "reference": "ref_durable_3" })).unwrap();

    let outcome = dispatcher.dispatch("charge.success", data).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Duplicate);
}

#[tokio::test]
async fn test_overlapping_deliveries_share_one_receipt() {
    let dir = tempfile::tempdir().unwrap();
    let (app, handler) = TestApp::with_slow_charge_handler(
        filesystem_store(&dir).await,
        Duration::from_millis(200),
    );
    let payload = charge_success("ref_durable_overlap");

    let second = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        app.post_signed(&payload).await
    };
    let ((first, _), (second, _)) = tokio::join!(app.post_signed(&payload), second);

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(handler.calls(), 1);
    assert_eq!(app.records.write_count().await, 1);
    assert_eq!(app.signals.signals().len(), 1);

    let id = EventId::new("charge.success_ref_durable_overlap").unwrap();
    let record = app.event_store.get(&id).await.unwrap().unwrap();
    assert!(record.processed);
}

#[tokio::test]
async fn test_long_reference_is_stored_and_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let reference = format!("ref_{}", "x".repeat(200));

    let app = TestApp::with_event_store(filesystem_store(&dir).await);
    let (first, _) = app.post_signed(&charge_success(&reference)).await;
    let (second, _) = app.post_signed(&charge_success(&reference)).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(app.records.write_count().await, 1);

    let id = EventId::new(format!("charge.success_{}", reference)).unwrap();
    assert!(app.event_store.is_processed(&id).await.unwrap());
}
