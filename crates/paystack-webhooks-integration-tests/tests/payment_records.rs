//! Integration tests for the built-in handlers behind the HTTP endpoint
//!
//! Each test posts signed events and checks the payment records and signals
//! they produce.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use paystack_webhooks_core::{PaymentRecordStore, Signal};
use serde_json::json;

#[tokio::test]
async fn test_charge_success_creates_transaction() {
    let app = TestApp::new();

    let (status, _) = app
        .post_signed(&json!({
            "event": "charge.success",
            "data": {
                "reference": "test_ref_123",
                "amount": 50000,
                "channel": "card",
                "fees": 750,
                "paid_at": "2024-01-01T10:00:00.000Z",
                "customer": { "email": "ada@example.com", "customer_code": "CUS_ada" },
                "authorization": { "authorization_code": "AUTH_abc" },
                "metadata": { "order_id": 991 }
            }
        }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let transaction = app
        .records
        .get_transaction("test_ref_123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status, "success");
    assert_eq!(transaction.amount, Some(50000));
    assert_eq!(transaction.currency, "NGN");
    assert_eq!(transaction.customer_email.as_deref(), Some("ada@example.com"));
    assert_eq!(transaction.authorization_code.as_deref(), Some("AUTH_abc"));
    assert_eq!(transaction.fees, Some(750));
    assert_eq!(transaction.metadata, Some(json!({ "order_id": 991 })));

    assert_eq!(app.signals.signals(), vec![Signal::PaymentSuccessful]);
    assert_eq!(app.signals.payloads()[0]["reference"], "test_ref_123");
}

#[tokio::test]
async fn test_failed_then_successful_charge_updates_one_row() {
    let app = TestApp::new();

    app.post_signed(&json!({
        "event": "charge.failed",
        "data": { "id": 1, "reference": "ref_retry", "amount": 1000 }
    }))
    .await;
    app.post_signed(&json!({
        "event": "charge.success",
        "data": { "id": 2, "reference": "ref_retry", "amount": 1000, "channel": "bank" }
    }))
    .await;

    assert_eq!(app.records.transaction_count().await, 1);
    let transaction = app
        .records
        .get_transaction("ref_retry")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status, "success");
    assert_eq!(transaction.channel.as_deref(), Some("bank"));
    assert_eq!(
        app.signals.signals(),
        vec![Signal::PaymentFailed, Signal::PaymentSuccessful]
    );
}

#[tokio::test]
async fn test_subscription_lifecycle() {
    let app = TestApp::new();

    app.post_signed(&json!({
        "event": "subscription.create",
        "data": {
            "subscription_code": "SUB_1",
            "amount": 5000,
            "plan": { "plan_code": "PLN_gold" },
            "customer": { "customer_code": "CUS_ada" }
        }
    }))
    .await;
    let created = app
        .records
        .get_subscription("SUB_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.status, "active");
    assert_eq!(created.plan_code.as_deref(), Some("PLN_gold"));

    app.post_signed(&json!({
        "event": "subscription.disable",
        "data": { "id": 77, "subscription_code": "SUB_1" }
    }))
    .await;
    let disabled = app
        .records
        .get_subscription("SUB_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(disabled.status, "cancelled");
    assert_eq!(disabled.plan_code.as_deref(), Some("PLN_gold"));

    assert_eq!(
        app.signals.signals(),
        vec![Signal::SubscriptionCreated, Signal::SubscriptionCancelled]
    );
}

#[tokio::test]
async fn test_disable_for_unknown_subscription_is_harmless() {
    let app = TestApp::new();

    let (status, _) = app
        .post_signed(&json!({
            "event": "subscription.disable",
            "data": { "subscription_code": "SUB_missing" }
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(app
        .records
        .get_subscription("SUB_missing")
        .await
        .unwrap()
        .is_none());
    assert_eq!(app.records.subscription_count().await, 0);
}

#[tokio::test]
async fn test_transfer_success_then_reversal() {
    let app = TestApp::new();

    app.post_signed(&json!({
        "event": "transfer.success",
        "data": {
            "transfer_code": "TRF_1",
            "reference": "payout_1",
            "amount": 100000,
            "reason": "Vendor payout",
            "recipient": { "recipient_code": "RCP_1" },
            "transferred_at": "2024-02-01T09:00:00.000Z"
        }
    }))
    .await;
    app.post_signed(&json!({
        "event": "transfer.reversed",
        "data": { "id": 900, "transfer_code": "TRF_1", "status": "reversed" }
    }))
    .await;

    let transfer = app.records.get_transfer("TRF_1").await.unwrap().unwrap();
    assert_eq!(transfer.status, "failed");
    assert_eq!(transfer.recipient_code.as_deref(), Some("RCP_1"));
    assert_eq!(
        transfer.transferred_at.as_deref(),
        Some("2024-02-01T09:00:00.000Z")
    );
    assert_eq!(transfer.raw_response["status"], "reversed");

    assert_eq!(app.signals.signals(), vec![Signal::TransferSuccessful]);
}

#[tokio::test]
async fn test_refund_and_dispute_only_signal() {
    let app = TestApp::new();

    app.post_signed(&json!({ "event": "refund.processed", "data": { "id": 31 } }))
        .await;
    app.post_signed(&json!({ "event": "dispute.create", "data": { "id": 32 } }))
        .await;
    app.post_signed(&json!({ "event": "dispute.resolve", "data": { "id": 33 } }))
        .await;

    assert_eq!(app.records.write_count().await, 0);
    assert_eq!(
        app.signals.signals(),
        vec![
            Signal::RefundProcessed,
            Signal::DisputeCreated,
            Signal::DisputeResolved
        ]
    );
}
