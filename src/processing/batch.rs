//! Caller-side batch orchestration with per-document outcomes.
//!
//! One failing document never aborts the batch: every input becomes a [`DocumentOutcome`] and
//! the report keeps input order.

use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::extract::ExtractionError;
use super::service::{DocumentRequest, PipelineApi};
use super::types::{Chunk, PipelineError, PipelineOutput, PipelineWarning};
use crate::metrics::IngestionMetrics;

/// One entry of a batch: either a valid request or one rejected while building it.
#[derive(Debug)]
pub enum BatchInput {
    /// Request ready to run.
    Ready(DocumentRequest),
    /// Request that could not be constructed (e.g. unsupported extension).
    Rejected {
        /// Identifier the document would have had.
        doc_id: String,
        /// Construction error.
        error: PipelineError,
    },
}

impl BatchInput {
    /// Build an input for a local file, capturing construction failures.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match DocumentRequest::local(path.clone()) {
            Ok(request) => Self::Ready(request),
            Err(error) => Self::Rejected {
                doc_id: display_name(&path),
                error,
            },
        }
    }
}

/// Expand files and directories into batch inputs.
///
/// Directories are walked recursively in file-name order. A path that cannot be read
/// becomes a [`BatchInput::Rejected`] entry and the walk continues.
pub fn collect_inputs<P: AsRef<Path>>(paths: &[P]) -> Vec<BatchInput> {
    let mut inputs = Vec::new();
    for root in paths {
        let root = root.as_ref();
        for entry in WalkDir::new(root).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    inputs.push(BatchInput::local(entry.into_path()));
                }
                Ok(_) => {}
                Err(error) => {
                    let path = error.path().unwrap_or(root).to_path_buf();
                    tracing::warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to read input path"
                    );
                    let doc_id = display_name(&path);
                    inputs.push(BatchInput::Rejected {
                        error: PipelineError::ExtractionFailed {
                            doc_id: doc_id.clone(),
                            source: ExtractionError::Io(error.into()),
                        },
                        doc_id,
                    });
                }
            }
        }
    }
    tracing::debug!(documents = inputs.len(), "Collected input documents");
    inputs
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl From<DocumentRequest> for BatchInput {
    fn from(request: DocumentRequest) -> Self {
        Self::Ready(request)
    }
}

/// Result of one document within a batch.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// Document produced a chunk set.
    Succeeded(PipelineOutput),
    /// Document failed; the rest of the batch continued.
    Failed {
        /// Failing document.
        doc_id: String,
        /// Error raised for it.
        error: PipelineError,
    },
}

impl DocumentOutcome {
    /// Identifier of the document this outcome belongs to.
    pub fn doc_id(&self) -> &str {
        match self {
            Self::Succeeded(output) => &output.doc_id,
            Self::Failed { doc_id, .. } => doc_id,
        }
    }
}

/// Aggregated outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-document outcomes.
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    /// Number of documents that produced chunks.
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, DocumentOutcome::Succeeded(_)))
            .count()
    }

    /// Number of documents that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Total chunks across successful documents.
    pub fn total_chunks(&self) -> usize {
        self.chunks().count()
    }

    /// Chunks of all successful documents, in input order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                DocumentOutcome::Succeeded(output) => Some(output),
                DocumentOutcome::Failed { .. } => None,
            })
            .flat_map(|output| output.chunks.iter())
    }

    /// Failed documents with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &PipelineError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            DocumentOutcome::Failed { doc_id, error } => Some((doc_id.as_str(), error)),
            DocumentOutcome::Succeeded(_) => None,
        })
    }

    /// Consume the report, keeping only the chunks.
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.outcomes
            .into_iter()
            .flat_map(|outcome| match outcome {
                DocumentOutcome::Succeeded(output) => output.chunks,
                DocumentOutcome::Failed { .. } => Vec::new(),
            })
            .collect()
    }
}

/// Process `inputs` with at most `concurrency` documents in flight.
pub async fn run_batch<P>(
    pipeline: &P,
    inputs: Vec<BatchInput>,
    concurrency: usize,
    metrics: &IngestionMetrics,
) -> BatchReport
where
    P: PipelineApi + ?Sized,
{
    tracing::info!(documents = inputs.len(), concurrency, "Starting batch");

    let outcomes: Vec<DocumentOutcome> = stream::iter(inputs)
        .map(|input| async move {
            match input {
                BatchInput::Rejected { doc_id, error } => DocumentOutcome::Failed { doc_id, error },
                BatchInput::Ready(request) => {
                    let doc_id = request.doc_id.clone();
                    match pipeline.process(request).await {
                        Ok(output) => DocumentOutcome::Succeeded(output),
                        Err(error) => DocumentOutcome::Failed { doc_id, error },
                    }
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    for outcome in &outcomes {
        match outcome {
            DocumentOutcome::Succeeded(output) => {
                let skipped = output
                    .warnings
                    .iter()
                    .filter(|warning| matches!(warning, PipelineWarning::ParagraphSkipped(_)))
                    .count();
                metrics.record_document(
                    output.chunks.len() as u64,
                    output.was_trimmed(),
                    skipped as u64,
                );
                tracing::info!(
                    doc_id = %output.doc_id,
                    chunks = output.chunks.len(),
                    warnings = output.warnings.len(),
                    "Processed document"
                );
            }
            DocumentOutcome::Failed { doc_id, error } => {
                metrics.record_failure();
                tracing::error!(doc_id = %doc_id, error = %error, "Failed to process document");
            }
        }
    }

    let report = BatchReport { outcomes };
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        chunks = report.total_chunks(),
        "Batch finished"
    );
    report
}
