use super::*;
use paystack_webhooks_core::SignalBus;
use serde_json::json;

#[test]
fn test_payload_key_value_prefers_reference() {
    let payload = json!({ "id": 42, "reference": "ref_1", "transfer_code": "TRF_1" });
    assert_eq!(payload_key_value(&payload).as_deref(), Some("ref_1"));
}

#[test]
fn test_payload_key_value_skips_empty_and_null() {
    let payload = json!({ "reference": "", "subscription_code": null, "id": 42 });
    assert_eq!(payload_key_value(&payload).as_deref(), Some("42"));
    assert_eq!(payload_key_value(&json!({})), None);
}

#[tokio::test]
async fn test_delivered_through_bus() {
    let bus = SignalBus::new();
    bus.subscribe(Arc::new(LoggingSubscriber::new()));

    let summary = bus
        .publish(Signal::PaymentSuccessful, json!({ "reference": "ref_1" }))
        .await;

    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.failed, 0);
}
