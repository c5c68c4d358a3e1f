//! Queue transport and the notification consumer.
//!
//! The gateway publishes one [`NotificationEvent`] per stored upload; a
//! background [`QueueConsumer`] polls the queue, feeds each event to the
//! ingestion coordinator, and deletes the message. Run failures are logged and
//! swallowed, so a bad document never takes the consumer down.

use crate::ingest::{IngestionService, RunOutcome};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Message describing a stored upload, published by the gateway and consumed
/// by the ingestion pipeline. Delivered at most once per upload; there is no
/// deduplication key, so redelivery produces duplicate index records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Full URL of the stored blob. Required for a run to start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Original file name as supplied by the uploader.
    #[serde(default)]
    pub file_name: String,
    /// Identifier generated for this upload.
    #[serde(default)]
    pub file_id: String,
}

/// Errors raised by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The configured queue URL was not a valid URL.
    #[error("invalid queue URL: {0}")]
    InvalidUrl(String),
    /// The HTTP request failed outright.
    #[error("queue request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The queue service answered with a non-success status.
    #[error("queue service returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
}

/// One message pulled off the queue.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueMessage {
    /// Receipt identifier used to delete the message after handling.
    pub id: String,
    /// Raw message body (a JSON-encoded [`NotificationEvent`]).
    pub body: String,
}

#[derive(Deserialize)]
struct ReceiveResponse {
    messages: Vec<QueueMessage>,
}

/// Lightweight HTTP client for a named queue.
#[derive(Clone)]
pub struct QueueClient {
    client: Client,
    base_url: String,
    queue_name: String,
    api_key: Option<String>,
}

impl QueueClient {
    /// Construct a new client for the given queue service and queue name.
    pub fn new(
        base_url: &str,
        queue_name: &str,
        api_key: Option<String>,
    ) -> Result<Self, QueueError> {
        let client = Client::builder().user_agent("docpipe/0.1").build()?;
        let parsed =
            reqwest::Url::parse(base_url).map_err(|err| QueueError::InvalidUrl(err.to_string()))?;
        tracing::debug!(url = %parsed, queue = queue_name, "Initialized queue client");

        Ok(Self {
            client,
            base_url: parsed.to_string().trim_end_matches('/').to_string(),
            queue_name: queue_name.to_string(),
            api_key,
        })
    }

    /// Publish a notification event as a JSON-encoded message.
    pub async fn send(&self, event: &NotificationEvent) -> Result<(), QueueError> {
        let response = self
            .request(reqwest::Method::POST, "messages")
            .json(event)
            .send()
            .await?;
        self.ensure_success(response).await?;
        tracing::debug!(queue = %self.queue_name, file_id = %event.file_id, "Notification published");
        Ok(())
    }

    /// Pull up to `max` pending messages off the queue.
    pub async fn receive(&self, max: usize) -> Result<Vec<QueueMessage>, QueueError> {
        let response = self
            .request(reqwest::Method::GET, "messages")
            .query(&[("max", max)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QueueError::UnexpectedStatus { status, body });
        }

        let payload: ReceiveResponse = response.json().await?;
        Ok(payload.messages)
    }

    /// Delete a handled message by its receipt identifier.
    pub async fn delete(&self, message_id: &str) -> Result<(), QueueError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("messages/{message_id}"))
            .send()
            .await?;
        self.ensure_success(response).await
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/queues/{}/{}", self.base_url, self.queue_name, path);
        let mut request = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            request = request.header("api-key", api_key);
        }
        request
    }

    async fn ensure_success(&self, response: reqwest::Response) -> Result<(), QueueError> {
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QueueError::UnexpectedStatus { status, body };
            tracing::error!(queue = %self.queue_name, error = %error, "Queue request failed");
            Err(error)
        }
    }
}

/// How many messages one poll pulls off the queue at most.
const RECEIVE_BATCH: usize = 16;

/// Background poller that drives the ingestion coordinator.
pub struct QueueConsumer {
    queue: QueueClient,
    ingestion: Arc<IngestionService>,
    poll_interval: Duration,
}

impl QueueConsumer {
    /// Create a consumer over the given queue and coordinator.
    pub fn new(
        queue: QueueClient,
        ingestion: Arc<IngestionService>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            ingestion,
            poll_interval,
        }
    }

    /// Poll and handle messages forever. Never returns under normal operation.
    pub async fn run(self) {
        tracing::info!(poll_interval_secs = self.poll_interval.as_secs(), "Queue consumer started");
        loop {
            let handled = self.poll_once().await;
            if handled == 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }

    /// Receive one batch, handle every message, and return how many were handled.
    ///
    /// Every internal failure is logged and swallowed here; nothing propagates
    /// to the caller, mirroring fire-and-forget trigger semantics.
    pub async fn poll_once(&self) -> usize {
        let messages = match self.queue.receive(RECEIVE_BATCH).await {
            Ok(messages) => messages,
            Err(error) => {
                tracing::error!(error = %error, "Failed to receive queue messages");
                return 0;
            }
        };

        let handled = messages.len();
        for message in messages {
            self.handle(message).await;
        }
        handled
    }

    async fn handle(&self, message: QueueMessage) {
        tracing::info!(message_id = %message.id, "Received queue message");

        match serde_json::from_str::<NotificationEvent>(&message.body) {
            Ok(event) => match self.ingestion.run(&event).await {
                Ok(RunOutcome::Indexed(summary)) => {
                    tracing::info!(
                        chunks = summary.chunk_count,
                        indexed = summary.indexed,
                        failed = summary.failed_embeddings,
                        "Ingestion run indexed"
                    );
                }
                Ok(RunOutcome::Skipped(reason)) => {
                    tracing::warn!(reason = %reason, "Ingestion run skipped");
                }
                Err(error) => {
                    tracing::error!(error = %error, "Ingestion run failed");
                }
            },
            Err(error) => {
                tracing::error!(message_id = %message.id, error = %error, "Failed to decode notification event");
            }
        }

        if let Err(error) = self.queue.delete(&message.id).await {
            tracing::warn!(message_id = %message.id, error = %error, "Failed to delete queue message");
        }
    }
}
