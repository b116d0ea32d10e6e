use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity across batches.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    documents_processed: AtomicU64,
    documents_failed: AtomicU64,
    chunks_produced: AtomicU64,
    documents_trimmed: AtomicU64,
    paragraphs_skipped: AtomicU64,
}

impl IngestionMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully processed document.
    pub fn record_document(&self, chunk_count: u64, trimmed: bool, skipped_paragraphs: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_produced
            .fetch_add(chunk_count, Ordering::Relaxed);
        if trimmed {
            self.documents_trimmed.fetch_add(1, Ordering::Relaxed);
        }
        self.paragraphs_skipped
            .fetch_add(skipped_paragraphs, Ordering::Relaxed);
    }

    /// Record a document that failed to process.
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chunks_produced: self.chunks_produced.load(Ordering::Relaxed),
            documents_trimmed: self.documents_trimmed.load(Ordering::Relaxed),
            paragraphs_skipped: self.paragraphs_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents that produced a chunk set.
    pub documents_processed: u64,
    /// Documents that failed with an error.
    pub documents_failed: u64,
    /// Chunks returned across all processed documents.
    pub chunks_produced: u64,
    /// Documents whose output was capped by `max_chunks`.
    pub documents_trimmed: u64,
    /// Paragraphs dropped by the assembler.
    pub paragraphs_skipped: u64,
}
