//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use paystack_webhooks_core::{HandlerSettings, SecretValue, SignatureMode};
use serde::{Deserialize, Serialize};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook endpoint settings
    pub webhooks: WebhookConfig,

    /// Paystack account and handler settings
    pub paystack: PaystackConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check settings that would otherwise fail at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paystack.secret_key.is_empty() {
            return Err(ConfigError::Missing {
                key: "paystack.secret_key".to_string(),
            });
        }

        if !self.webhooks.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.endpoint_path must start with '/', got '{}'",
                    self.webhooks.endpoint_path
                ),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        if self.webhooks.signature_header.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "webhooks.signature_header must not be empty".to_string(),
            });
        }

        for ip in &self.webhooks.allowed_ips {
            if ip.parse::<std::net::IpAddr>().is_err() {
                return Err(ConfigError::Invalid {
                    message: format!("webhooks.allowed_ips contains invalid address '{}'", ip),
                });
            }
        }

        if self.paystack.storage_backend == StorageBackend::Filesystem
            && self.paystack.storage_path.trim().is_empty()
        {
            return Err(ConfigError::Missing {
                key: "paystack.storage_path".to_string(),
            });
        }

        Ok(())
    }

    /// Side effects enabled for the built-in handlers
    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            enable_models: self.paystack.enable_models,
            enable_signals: self.paystack.enable_signals,
        }
    }

    pub fn signature_mode(&self) -> SignatureMode {
        if self.paystack.strict_signatures {
            SignatureMode::Strict
        } else {
            SignatureMode::Open
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Webhook endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Header carrying the HMAC signature
    pub signature_header: String,

    /// Keep the full request payload on stored webhook records
    pub store_payloads: bool,

    /// Source addresses allowed to deliver webhooks (empty = all)
    pub allowed_ips: Vec<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/paystack/webhook".to_string(),
            signature_header: paystack_webhooks_core::signature::SIGNATURE_HEADER.to_string(),
            store_payloads: true,
            allowed_ips: vec![],
        }
    }
}

/// Where stored webhook records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Filesystem,
}

/// Paystack account and handler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaystackConfig {
    /// Account secret key (required)
    pub secret_key: SecretValue,

    /// Secret used to verify webhook signatures
    pub webhook_secret: SecretValue,

    /// Persist webhook receipts and payment records
    pub enable_models: bool,

    /// Publish signals from the built-in handlers
    pub enable_signals: bool,

    /// Reject every webhook when no webhook secret is configured
    pub strict_signatures: bool,

    /// Backend for stored webhook records
    pub storage_backend: StorageBackend,

    /// Base directory for the filesystem backend
    pub storage_path: String,
}

impl Default for PaystackConfig {
    fn default() -> Self {
        Self {
            secret_key: SecretValue::default(),
            webhook_secret: SecretValue::default(),
            enable_models: true,
            enable_signals: true,
            strict_signatures: false,
            storage_backend: StorageBackend::Memory,
            storage_path: "./data".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
