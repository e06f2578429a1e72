//! # Infrastructure Adapters
//!
//! Implementations of the webhook event store and payment record store
//! interfaces.

pub mod filesystem_store;
pub mod memory_store;

pub use filesystem_store::FilesystemWebhookEventStore;
pub use memory_store::{InMemoryPaymentRecords, InMemoryWebhookEventStore};
