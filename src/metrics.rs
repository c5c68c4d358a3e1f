use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
    chunks_failed: AtomicU64,
    runs_skipped: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document whose batch reached the search index.
    pub fn record_indexed(&self, chunk_count: u64, failed_embeddings: u64) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
        self.chunks_failed
            .fetch_add(failed_embeddings, Ordering::Relaxed);
    }

    /// Record a run that ended before anything reached the index.
    pub fn record_skipped(&self) {
        self.runs_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
            runs_skipped: self.runs_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents whose records reached the search index since startup.
    pub documents_indexed: u64,
    /// Total chunk records upserted across all indexed documents.
    pub chunks_indexed: u64,
    /// Chunks dropped because their embedding call failed.
    pub chunks_failed: u64,
    /// Runs that ended in the skipped state without touching the index.
    pub runs_skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = IngestMetrics::new();
        metrics.record_indexed(2, 0);
        metrics.record_indexed(3, 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_indexed, 2);
        assert_eq!(snapshot.chunks_indexed, 5);
        assert_eq!(snapshot.chunks_failed, 1);
        assert_eq!(snapshot.runs_skipped, 0);
    }

    #[test]
    fn records_skipped_runs() {
        let metrics = IngestMetrics::new();
        metrics.record_skipped();
        metrics.record_skipped();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.runs_skipped, 2);
        assert_eq!(snapshot.documents_indexed, 0);
    }
}
