//! Prometheus metrics for the webhook endpoint.
//!
//! Each [`ServiceMetrics`] owns its own [`Registry`] so several routers can
//! coexist in one process (tests build one per case).

use crate::errors::IngressError;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    pub webhooks_received_total: IntCounter,
    pub signature_failures_total: IntCounter,
    pub payload_rejections_total: IntCounter,
    pub source_rejections_total: IntCounter,
    pub duplicates_total: IntCounter,
    pub processing_failures_total: IntCounter,
    pub processing_duration_seconds: Histogram,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new_custom(Some("paystack_webhooks".to_string()), None)?;

        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let counter = IntCounter::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let webhooks_received_total =
            counter("webhooks_received_total", "Total webhook requests received")?;
        let signature_failures_total = counter(
            "signature_failures_total",
            "Webhooks rejected for a missing or invalid signature",
        )?;
        let payload_rejections_total = counter(
            "payload_rejections_total",
            "Webhooks rejected for a malformed payload",
        )?;
        let source_rejections_total = counter(
            "source_rejections_total",
            "Webhooks rejected by the source address allowlist",
        )?;
        let duplicates_total = counter(
            "duplicates_total",
            "Webhooks acknowledged as already processed",
        )?;
        let processing_failures_total = counter(
            "processing_failures_total",
            "Webhooks whose handler failed",
        )?;

        let processing_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "processing_duration_seconds",
                "Webhook processing time distribution",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;
        registry.register(Box::new(processing_duration_seconds.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhooks_received_total,
            signature_failures_total,
            payload_rejections_total,
            source_rejections_total,
            duplicates_total,
            processing_failures_total,
            processing_duration_seconds,
        }))
    }

    /// Count a failed request by its cause
    pub fn record_error(&self, error: &IngressError) {
        match error {
            IngressError::MissingSignature | IngressError::InvalidSignature => {
                self.signature_failures_total.inc()
            }
            IngressError::ForbiddenSource { .. } => self.source_rejections_total.inc(),
            IngressError::Processing(_) => self.processing_failures_total.inc(),
            IngressError::InvalidJson
            | IngressError::MissingEventType
            | IngressError::InvalidEventData
            | IngressError::PayloadTooLarge { .. }
            | IngressError::BodyRead { .. } => self.payload_rejections_total.inc(),
        }
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
