//! Error types for the HTTP service

use crate::responses::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use paystack_webhooks_core::WebhookProcessingError;
use tracing::{error, warn};

/// Webhook ingress errors with HTTP status code mapping
///
/// - `403 Forbidden`: request from an address outside the allowlist
/// - `400 Bad Request`: missing or invalid signature, malformed payload.
///   Paystack should not retry these.
/// - `413 Payload Too Large`: body over the configured limit
/// - `500 Internal Server Error`: a handler failed; the stored record keeps
///   the message and Paystack's redelivery will retry the event
///
/// Every variant renders as `{"status":"error","message":...}`.
#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("IP address not allowed")]
    ForbiddenSource { ip: Option<String> },

    #[error("Missing signature")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing event type")]
    MissingEventType,

    #[error("Invalid event data")]
    InvalidEventData,

    #[error("Payload too large (max: {max_size} bytes)")]
    PayloadTooLarge { max_size: usize },

    #[error("Failed to read request body")]
    BodyRead { message: String },

    #[error("{0}")]
    Processing(#[from] WebhookProcessingError),
}

impl IngressError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ForbiddenSource { .. } => StatusCode::FORBIDDEN,
            Self::MissingSignature
            | Self::InvalidSignature
            | Self::InvalidJson
            | Self::MissingEventType
            | Self::InvalidEventData
            | Self::BodyRead { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if the request was rejected before any event was parsed
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Processing(_))
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::ForbiddenSource { ip } => {
                warn!(client_ip = ?ip, "Webhook from address outside allowlist");
            }
            Self::BodyRead { message } => {
                warn!(error = %message, "Failed to read webhook body");
            }
            Self::Processing(e) => {
                error!(
                    event_type = %e.event_type,
                    event_id = %e.event_id,
                    error = %e.message,
                    "Webhook handling error"
                );
            }
            _ => {
                warn!(status = %status, error = %self, "Webhook rejected");
            }
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
