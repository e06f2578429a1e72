//! # Webhook Ingress
//!
//! The `POST {endpoint_path}` handler. A request moves through these stages,
//! stopping at the first failure:
//!
//! 1. source address check (only when an allowlist is configured)
//! 2. signature check against the raw body
//! 3. payload parse: a JSON object with a string `event` and optional `data`
//! 4. receipt stored (when an event store is configured)
//! 5. dispatch
//! 6. receipt marked processed, or the failure recorded on it

use crate::errors::IngressError;
use crate::responses::StatusResponse;
use crate::AppState;
use axum::{
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    response::Json,
};
use paystack_webhooks_core::{
    DispatchOutcome, EventData, IncomingEvent, StoreError, StoredWebhookRecord, WebhookEventStore,
};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use tracing::{debug, error, info, instrument, warn};

/// Published source addresses of Paystack's webhook senders
pub const PAYSTACK_WEBHOOK_IPS: [&str; 3] = ["52.31.139.75", "52.49.173.169", "52.214.14.220"];

/// Receive one Paystack webhook
#[instrument(skip_all, fields(event_type, event_id, client_ip))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<StatusResponse>, IngressError> {
    state.metrics.webhooks_received_total.inc();
    let timer = state.metrics.processing_duration_seconds.start_timer();

    let result = process_webhook(&state, request).await;
    timer.observe_duration();

    if let Err(e) = &result {
        state.metrics.record_error(e);
    }
    result.map(|()| Json(StatusResponse::success()))
}

async fn process_webhook(state: &AppState, request: Request) -> Result<(), IngressError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();
    let headers = parts.headers;

    let client_ip = client_ip(&headers, peer);
    if let Some(ip) = &client_ip {
        tracing::Span::current().record("client_ip", ip.as_str());
    }
    check_source(&state.config.webhooks.allowed_ips, client_ip.as_deref())?;

    let signature = headers
        .get(state.config.webhooks.signature_header.as_str())
        .ok_or(IngressError::MissingSignature)?
        .to_str()
        .map_err(|_| IngressError::InvalidSignature)?
        .to_string();

    let max_size = state.config.server.max_body_size;
    let body = to_bytes(body, max_size).await.map_err(|e| {
        if is_length_limit_error(&e) {
            IngressError::PayloadTooLarge { max_size }
        } else {
            IngressError::BodyRead {
                message: e.to_string(),
            }
        }
    })?;

    if !state.verifier.verify(&body, &signature) {
        return Err(IngressError::InvalidSignature);
    }

    let (payload, event) = parse_payload(&body)?;
    let span = tracing::Span::current();
    span.record("event_type", event.event_type.as_str());
    span.record("event_id", event.event_id.as_str());

    let mut recorded = None;
    if let Some(store) = &state.event_store {
        let stored_payload = if state.config.webhooks.store_payloads {
            payload
        } else {
            Value::Null
        };
        let record =
            StoredWebhookRecord::new(&event.event_type, event.event_id.clone(), stored_payload)
                .with_source_ip(client_ip.clone())
                .with_user_agent(header_string(&headers, "user-agent"));

        match store_receipt(store.as_ref(), record).await {
            Receipt::Stored => recorded = Some(store),
            Receipt::AlreadyProcessed => {
                info!("Webhook already processed, acknowledging duplicate");
                state.metrics.duplicates_total.inc();
                return Ok(());
            }
            Receipt::InProgress => {
                info!("Webhook delivery already in progress, acknowledging duplicate");
                state.metrics.duplicates_total.inc();
                return Ok(());
            }
            Receipt::Unavailable => {}
        }
    }

    match state.dispatcher.dispatch_event(&event).await {
        Ok(outcome) => {
            if outcome == DispatchOutcome::Duplicate {
                state.metrics.duplicates_total.inc();
            }
            if let Some(store) = recorded {
                if let Err(e) = store.mark_processed(&event.event_id).await {
                    warn!(error = %e, "Failed to mark webhook record processed");
                }
            }
            debug!(outcome = ?outcome, "Webhook accepted");
            Ok(())
        }
        Err(e) => {
            if let Some(store) = recorded {
                let message = e.to_string();
                if let Err(store_error) = store.record_failure(&event.event_id, &message).await {
                    warn!(error = %store_error, "Failed to record webhook processing error");
                }
            }
            Err(IngressError::Processing(e))
        }
    }
}

/// Parse the body into the full payload and the event it carries
fn parse_payload(body: &[u8]) -> Result<(Value, IncomingEvent), IngressError> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| IngressError::InvalidJson)?;
    let Some(object) = payload.as_object() else {
        return Err(IngressError::InvalidJson);
    };

    let event_type = object
        .get("event")
        .and_then(Value::as_str)
        .filter(|event| !event.is_empty())
        .ok_or(IngressError::MissingEventType)?
        .to_string();

    let data = match object.get("data") {
        None | Some(Value::Null) => EventData::new(Map::new()),
        Some(Value::Object(fields)) => EventData::new(fields.clone()),
        Some(_) => return Err(IngressError::InvalidEventData),
    };

    let event = IncomingEvent::new(event_type, data);
    Ok((payload, event))
}

enum Receipt {
    Stored,
    AlreadyProcessed,
    InProgress,
    Unavailable,
}

/// Insert the receipt, resolving unique-key conflicts
///
/// A conflicting record that is already processed means the event was
/// handled before. One carrying a failure is claimed for this attempt; any
/// other unprocessed record belongs to a delivery still being processed.
async fn store_receipt(store: &dyn WebhookEventStore, record: StoredWebhookRecord) -> Receipt {
    let event_id = record.event_id.clone();
    match store.insert(record).await {
        Ok(()) => Receipt::Stored,
        Err(StoreError::Conflict { .. }) => match store.get(&event_id).await {
            Ok(Some(existing)) if existing.processed => Receipt::AlreadyProcessed,
            Ok(Some(_)) => match store.claim_retry(&event_id).await {
                Ok(true) => {
                    info!("Retrying previously failed webhook");
                    Receipt::Stored
                }
                Ok(false) => Receipt::InProgress,
                Err(e) => {
                    error!(error = %e, "Failed to claim failed webhook record for retry");
                    Receipt::Unavailable
                }
            },
            Ok(None) => {
                warn!("Conflicting webhook record disappeared, continuing without it");
                Receipt::Unavailable
            }
            Err(e) => {
                error!(error = %e, "Failed to load conflicting webhook record");
                Receipt::Unavailable
            }
        },
        Err(e) => {
            error!(error = %e, "Failed to store webhook event");
            Receipt::Unavailable
        }
    }
}

/// Client address: first `X-Forwarded-For` entry, else the socket peer
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_string(headers, "x-forwarded-for")
        .and_then(|value| {
            value
                .split(',')
                .next()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        })
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn check_source(allowed_ips: &[String], client_ip: Option<&str>) -> Result<(), IngressError> {
    if allowed_ips.is_empty() {
        return Ok(());
    }

    match client_ip {
        Some(ip) if allowed_ips.iter().any(|allowed| allowed == ip) => Ok(()),
        _ => Err(IngressError::ForbiddenSource {
            ip: client_ip.map(str::to_string),
        }),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn is_length_limit_error(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(current) = source {
        if current.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = current.source();
    }
    false
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod tests;
