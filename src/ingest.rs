//! Ingestion coordinator.
//!
//! One run per notification event, moving through four states with no branching
//! back: received, extracted, chunked-and-embedded, then indexed or skipped.
//! The coordinator owns injected handles to the blob store, embedding client,
//! and search index so every surface (and every test) drives the same pipeline.

use crate::{
    chunking::{Splitter, chunk_text},
    embedding::EmbeddingClient,
    extract::{self, ExtractError},
    metrics::IngestMetrics,
    queue::NotificationEvent,
    search::{IndexDocument, SearchIndexService},
    storage::{self, BlobStore, StorageError},
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The triggering event carried no file URL.
    #[error("notification event is missing file_url")]
    MalformedEvent,
    /// Blob URL parsing or the blob download failed.
    #[error("storage access failed: {0}")]
    Storage(#[from] StorageError),
    /// The single batch upload to the search index failed. Terminal for the
    /// run; nothing was written and nothing is retried.
    #[error("index upload failed: {0}")]
    IndexUpload(#[from] crate::search::SearchIndexError),
}

/// Why a run ended without reaching the search index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The declared extension is not one of the supported set.
    UnsupportedFileType(String),
    /// The file bytes could not be turned into text.
    ExtractionFailed(String),
    /// No chunk survived embedding (or the document produced no chunks).
    NoEmbeddedChunks,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFileType(extension) => {
                write!(f, "unsupported file type: {extension}")
            }
            Self::ExtractionFailed(message) => write!(f, "extraction failed: {message}"),
            Self::NoEmbeddedChunks => write!(f, "no embedded chunks to upload"),
        }
    }
}

/// Terminal state of a completed ingestion run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The batch upsert reached the search index.
    Indexed(IngestSummary),
    /// The run completed without touching the index.
    Skipped(SkipReason),
}

/// Counters describing one indexed run.
#[derive(Debug, Clone, Copy)]
pub struct IngestSummary {
    /// Chunks produced from the extracted text.
    pub chunk_count: usize,
    /// Records that made it into the batch upsert.
    pub indexed: usize,
    /// Chunks dropped because their embedding call failed.
    pub failed_embeddings: usize,
}

/// Pause observed between embedding and the index upload.
///
/// A deliberate throttle against indexing-service rate limits after a burst of
/// embedding traffic. Expressed as its own policy value so a smarter
/// backpressure scheme can replace the fixed wait without touching run logic.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexThrottle {
    delay: Duration,
}

impl IndexThrottle {
    /// Throttle with a fixed delay. `Duration::ZERO` disables the wait.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }
        tracing::info!(
            delay_secs = self.delay.as_secs(),
            "Throttling before index upload"
        );
        tokio::time::sleep(self.delay).await;
    }
}

/// Coordinates the full ingestion pipeline for one document: download,
/// extraction, chunking, per-chunk embedding, and the single batch upsert.
///
/// Construct the service once near process start and share it through an `Arc`;
/// it holds the long-lived client handles for every remote dependency.
pub struct IngestionService {
    storage: Arc<BlobStore>,
    embedder: Box<dyn EmbeddingClient>,
    search: SearchIndexService,
    splitter: Box<dyn Splitter>,
    throttle: IndexThrottle,
    metrics: Arc<IngestMetrics>,
}

impl IngestionService {
    /// Build a coordinator from its injected collaborators.
    pub fn new(
        storage: Arc<BlobStore>,
        embedder: Box<dyn EmbeddingClient>,
        search: SearchIndexService,
        splitter: Box<dyn Splitter>,
        throttle: IndexThrottle,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        Self {
            storage,
            embedder,
            search,
            splitter,
            throttle,
            metrics,
        }
    }

    /// Execute one ingestion run for a notification event.
    ///
    /// Extraction failures end the run in the skipped state; malformed events,
    /// storage failures, and index-upload failures surface as errors. Either
    /// way the run is complete; callers log and move on.
    pub async fn run(&self, event: &NotificationEvent) -> Result<RunOutcome, IngestError> {
        let file_url = event
            .file_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(IngestError::MalformedEvent)?;

        let (container, blob_name) = storage::parse_blob_url(file_url)?;
        let file_name = base_name(&blob_name).to_string();
        let extension = extension_of(&file_name);
        tracing::info!(container = %container, blob = %blob_name, "Processing notification");

        let bytes = self.storage.download(&container, &blob_name).await?;

        let text = match extract::extract(&bytes, &extension) {
            Ok(text) => text,
            Err(ExtractError::UnsupportedFileType(extension)) => {
                tracing::warn!(blob = %blob_name, extension = %extension, "Unsupported file type; skipping");
                self.metrics.record_skipped();
                return Ok(RunOutcome::Skipped(SkipReason::UnsupportedFileType(
                    extension,
                )));
            }
            Err(error) => {
                tracing::warn!(blob = %blob_name, error = %error, "Extraction failed; skipping");
                self.metrics.record_skipped();
                return Ok(RunOutcome::Skipped(SkipReason::ExtractionFailed(
                    error.to_string(),
                )));
            }
        };

        let chunks = chunk_text(&text, self.splitter.as_ref());
        let chunk_count = chunks.len();
        tracing::info!(chunks = chunk_count, "Chunked document");

        let mut documents = Vec::with_capacity(chunk_count);
        let mut failed_embeddings = 0usize;
        for chunk in chunks {
            // One remote call per chunk, strictly sequential. A failure drops
            // this chunk only; its sequence index is simply absent downstream.
            match self.embedder.embed(&chunk.text).await {
                Ok(vector) => documents.push(IndexDocument {
                    id: Uuid::new_v4().to_string(),
                    content: chunk.text,
                    content_vector: vector,
                    file_name: file_name.clone(),
                }),
                Err(error) => {
                    failed_embeddings += 1;
                    tracing::error!(chunk = chunk.index, error = %error, "Failed to embed chunk");
                }
            }
        }

        if documents.is_empty() {
            tracing::warn!(blob = %blob_name, failed = failed_embeddings, "No embedded chunks to upload");
            self.metrics.record_skipped();
            return Ok(RunOutcome::Skipped(SkipReason::NoEmbeddedChunks));
        }

        self.throttle.wait().await;

        let indexed = documents.len();
        self.search.upsert_documents(&documents).await?;
        self.metrics
            .record_indexed(indexed as u64, failed_embeddings as u64);
        tracing::info!(
            file = %file_name,
            chunks = chunk_count,
            indexed,
            failed = failed_embeddings,
            "Document indexed"
        );

        Ok(RunOutcome::Indexed(IngestSummary {
            chunk_count,
            indexed,
            failed_embeddings,
        }))
    }
}

/// Last path segment of a blob name.
fn base_name(blob_name: &str) -> &str {
    blob_name.rsplit('/').next().unwrap_or(blob_name)
}

/// File extension including the leading dot, lowercased; empty when absent.
fn extension_of(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(position) if position > 0 => file_name[position..].to_lowercase(),
        _ => String::new(),
    }
}
