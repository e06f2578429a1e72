//! # Filesystem Webhook Event Store
//!
//! Durable [`WebhookEventStore`] keeping one JSON file per event under
//! `{base_path}/webhook-events/`. File names are the hex SHA-256 digest of
//! the event identifier, so any identifier maps to a safe name of fixed
//! length regardless of how long the event reference is.
//!
//! New records are written to a temporary file and hard-linked into place,
//! which fails if the target already exists. That gives inserts the same
//! unique-key behaviour a database constraint would. Updates rewrite the file
//! through a temporary file and a rename.

use crate::store::{StoreError, StoredWebhookRecord, WebhookEventStore};
use crate::EventId;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

const EVENTS_DIR: &str = "webhook-events";

/// Filesystem-based webhook event store
///
/// # Examples
///
/// ```no_run
/// use paystack_webhooks_core::adapters::FilesystemWebhookEventStore;
/// use std::path::PathBuf;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FilesystemWebhookEventStore::new(PathBuf::from("./data")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FilesystemWebhookEventStore {
    events_path: PathBuf,
    // Serializes read-modify-write updates
    update_lock: Mutex<()>,
}

impl FilesystemWebhookEventStore {
    /// Create the store, creating its directory if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub async fn new(base_path: PathBuf) -> Result<Self, StoreError> {
        let events_path = base_path.join(EVENTS_DIR);
        fs::create_dir_all(&events_path)
            .await
            .map_err(|e| StoreError::OperationFailed {
                message: format!("Failed to create event directory: {}", e),
            })?;

        Ok(Self {
            events_path,
            update_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, event_id: &EventId) -> PathBuf {
        self.events_path.join(format!("{}.json", file_stem(event_id)))
    }

    fn temp_path(&self, event_id: &EventId) -> PathBuf {
        self.events_path.join(format!(
            "{}.{}.tmp",
            file_stem(event_id),
            uuid::Uuid::new_v4().simple()
        ))
    }

    async fn write_temp(
        &self,
        event_id: &EventId,
        record: &StoredWebhookRecord,
    ) -> Result<PathBuf, StoreError> {
        let json =
            serde_json::to_vec_pretty(record).map_err(|e| StoreError::Serialization {
                message: format!("Failed to serialize record: {}", e),
            })?;

        let temp_path = self.temp_path(event_id);
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::OperationFailed {
                message: format!("Failed to create temp file: {}", e),
            })?;

        let written = async {
            file.write_all(&json).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            remove_quietly(&temp_path).await;
            return Err(StoreError::OperationFailed {
                message: format!("Failed to write record: {}", e),
            });
        }

        Ok(temp_path)
    }

    async fn read_record(&self, path: &Path) -> Result<Option<StoredWebhookRecord>, StoreError> {
        let json = match fs::read(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::OperationFailed {
                    message: format!("Failed to read record: {}", e),
                })
            }
        };

        serde_json::from_slice(&json)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                message: format!("Failed to deserialize record: {}", e),
            })
    }

    /// Read-modify-write a record; `change` returns whether anything changed
    ///
    /// The file is only rewritten when it did. Returns the value of `change`.
    async fn update<F>(&self, event_id: &EventId, change: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut StoredWebhookRecord) -> bool + Send,
    {
        let _guard = self.update_lock.lock().await;
        let path = self.record_path(event_id);
        let mut record = self
            .read_record(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                event_id: event_id.clone(),
            })?;

        if !change(&mut record) {
            return Ok(false);
        }

        let temp_path = self.write_temp(event_id, &record).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            remove_quietly(&temp_path).await;
            return Err(StoreError::OperationFailed {
                message: format!("Failed to replace record: {}", e),
            });
        }

        Ok(true)
    }
}

#[async_trait]
impl WebhookEventStore for FilesystemWebhookEventStore {
    async fn insert(&self, record: StoredWebhookRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.event_id);
        let temp_path = self.write_temp(&record.event_id, &record).await?;

        let linked = fs::hard_link(&temp_path, &path).await;
        remove_quietly(&temp_path).await;

        match linked {
            Ok(()) => {
                debug!(event_id = %record.event_id, path = %path.display(), "Stored webhook record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::Conflict {
                event_id: record.event_id,
            }),
            Err(e) => Err(StoreError::OperationFailed {
                message: format!("Failed to create record file: {}", e),
            }),
        }
    }

    async fn get(&self, event_id: &EventId) -> Result<Option<StoredWebhookRecord>, StoreError> {
        self.read_record(&self.record_path(event_id)).await
    }

    async fn mark_processed(&self, event_id: &EventId) -> Result<(), StoreError> {
        self.update(event_id, |record| {
            record.processed = true;
            record.processing_error = None;
            true
        })
        .await?;
        Ok(())
    }

    async fn record_failure(&self, event_id: &EventId, message: &str) -> Result<(), StoreError> {
        let message = message.to_string();
        self.update(event_id, move |record| {
            record.processed = false;
            record.processing_error = Some(message);
            true
        })
        .await?;
        Ok(())
    }

    async fn claim_retry(&self, event_id: &EventId) -> Result<bool, StoreError> {
        self.update(event_id, |record| {
            if record.processed || record.processing_error.is_none() {
                return false;
            }
            record.processing_error = None;
            true
        })
        .await
    }
}

fn file_stem(event_id: &EventId) -> String {
    hex::encode(Sha256::digest(event_id.as_str().as_bytes()))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "Failed to remove temp file");
    }
}

#[cfg(test)]
#[path = "filesystem_store_tests.rs"]
mod tests;
