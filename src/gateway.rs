//! Upload gateway service.
//!
//! Stores an inbound file in the blob store and publishes the notification
//! event that triggers asynchronous ingestion. The HTTP surface in
//! [`crate::api`] talks to this through the [`UploadApi`] trait so tests can
//! substitute a double.

use crate::queue::{NotificationEvent, QueueClient, QueueError};
use crate::storage::{BlobStore, StorageError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while storing an upload and publishing its notification.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The blob store rejected or failed the write.
    #[error("storage upload failed: {0}")]
    Storage(#[from] StorageError),
    /// The notification could not be published.
    #[error("queue publish failed: {0}")]
    Queue(#[from] QueueError),
}

/// Confirmation returned after a successful upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// URL of the stored blob.
    pub file_url: String,
    /// Identifier generated for this upload.
    pub file_id: String,
}

/// Abstraction over the upload gateway used by the HTTP surface.
#[async_trait]
pub trait UploadApi: Send + Sync {
    /// Store a file and publish the notification event referencing it.
    async fn store_and_notify(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, UploadError>;
}

/// Production gateway backed by the blob store and queue clients.
pub struct UploadService {
    storage: Arc<BlobStore>,
    queue: QueueClient,
    container: String,
}

impl UploadService {
    /// Build a gateway writing into `container` and publishing to `queue`.
    pub fn new(storage: Arc<BlobStore>, queue: QueueClient, container: String) -> Self {
        Self {
            storage,
            queue,
            container,
        }
    }
}

#[async_trait]
impl UploadApi for UploadService {
    async fn store_and_notify(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, UploadError> {
        let file_url = self.storage.upload(&self.container, file_name, bytes).await?;
        let file_id = Uuid::new_v4().to_string();

        let event = NotificationEvent {
            file_url: Some(file_url.clone()),
            file_name: file_name.to_string(),
            file_id: file_id.clone(),
        };
        self.queue.send(&event).await?;

        tracing::info!(file = %file_name, file_id = %file_id, "Uploaded file and published notification");
        Ok(UploadReceipt { file_url, file_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, Method::PUT, MockServer};

    #[tokio::test]
    async fn upload_stores_blob_then_publishes_event() {
        let server = MockServer::start_async().await;
        let blob_mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/uploaded-files/notes.txt")
                    .body("contents");
                then.status(201);
            })
            .await;
        let queue_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/queues/file-upload-events/messages")
                    .body_contains("/uploaded-files/notes.txt")
                    .body_contains("\"file_name\":\"notes.txt\"");
                then.status(201);
            })
            .await;

        let storage = Arc::new(BlobStore::new(&server.base_url(), None).expect("store"));
        let queue =
            QueueClient::new(&server.base_url(), "file-upload-events", None).expect("queue");
        let gateway = UploadService::new(storage, queue, "uploaded-files".into());

        let receipt = gateway
            .store_and_notify("notes.txt", b"contents".to_vec())
            .await
            .expect("upload");

        blob_mock.assert();
        queue_mock.assert();
        assert!(receipt.file_url.ends_with("/uploaded-files/notes.txt"));
        assert!(!receipt.file_id.is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_surfaced_and_nothing_is_published() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/uploaded-files/notes.txt");
                then.status(507).body("out of space");
            })
            .await;
        let queue_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/queues/file-upload-events/messages");
                then.status(201);
            })
            .await;

        let storage = Arc::new(BlobStore::new(&server.base_url(), None).expect("store"));
        let queue =
            QueueClient::new(&server.base_url(), "file-upload-events", None).expect("queue");
        let gateway = UploadService::new(storage, queue, "uploaded-files".into());

        let error = gateway
            .store_and_notify("notes.txt", b"contents".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(error, UploadError::Storage(_)));
        queue_mock.assert_hits(0);
    }
}
