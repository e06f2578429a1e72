use super::*;
use axum::{body::Body, http::Request};
use paystack_webhooks_core::{
    EventDeduplicator, HandlerRegistry, InMemoryWebhookEventStore, SecretValue, SignatureMode,
};
use tower::ServiceExt;

fn create_test_state(event_store: Option<Arc<dyn WebhookEventStore>>) -> AppState {
    let mut config = ServiceConfig::default();
    config.paystack.secret_key = SecretValue::from("sk_test_router");
    config.paystack.webhook_secret = SecretValue::from("whsec_router");

    let verifier = SignatureVerifier::new(
        config.paystack.webhook_secret.clone(),
        SignatureMode::Strict,
    );
    let dispatcher = Arc::new(EventDispatcher::new(
        HandlerRegistry::new(),
        EventDeduplicator::in_memory(),
    ));

    AppState::new(
        config,
        verifier,
        dispatcher,
        event_store,
        ServiceMetrics::new().unwrap(),
    )
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check_reports_event_store() {
    let store: Arc<dyn WebhookEventStore> = Arc::new(InMemoryWebhookEventStore::new());
    let app = create_router(create_test_state(Some(store)));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["event_store"], true);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint_renders_prometheus_text() {
    let state = create_test_state(None);
    state.metrics.webhooks_received_total.inc();
    let app = create_router(state);

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("paystack_webhooks_webhooks_received_total 1"));
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let app = create_router(create_test_state(None));

    let response = app
        .oneshot(
            Request::get("/health")
                .header("x-correlation-id", "corr-1234")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        "corr-1234"
    );
}

#[tokio::test]
async fn test_correlation_id_is_generated_when_absent() {
    let app = create_router(create_test_state(None));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let generated = response
        .headers()
        .get("x-correlation-id")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn test_webhook_endpoint_only_accepts_post() {
    let app = create_router(create_test_state(None));

    let response = app
        .oneshot(Request::get("/paystack/webhook").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_custom_endpoint_path_is_routed() {
    let mut state = create_test_state(None);
    let mut config = (*state.config).clone();
    config.webhooks.endpoint_path = "/hooks/paystack".to_string();
    state.config = Arc::new(config);
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(
            Request::post("/hooks/paystack")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::post("/paystack/webhook")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_server_rejects_invalid_host() {
    let mut state = create_test_state(None);
    let mut config = (*state.config).clone();
    config.server.host = "not a host".to_string();
    state.config = Arc::new(config);

    let result = start_server(state).await;
    assert!(matches!(result, Err(ServiceError::BindFailed { .. })));
}
