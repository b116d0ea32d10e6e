//! Pipeline driver coordinating staging, extraction, chunking, and output capping.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{
    assemble::{AssembledDocument, ChunkAssembler},
    chunking::{ChunkConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, RecursiveChunker},
    extract::{DocumentFormat, OcrEngine, TextExtractor},
    fetch::{self, DocumentFetcher},
    types::{Chunk, PipelineError, PipelineOutput, PipelineWarning},
};

/// Read-only settings applied to every document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Optional cap on chunks returned per document; `0` disables the cap.
    pub max_chunks: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_chunks: None,
        }
    }
}

/// Where a document's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// File already on local storage; read in place and never modified.
    Local(PathBuf),
    /// File behind an HTTP(S) URL; staged to a temporary file for the duration of the call.
    Remote(String),
}

/// A single document to run through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    /// Byte source.
    pub source: DocumentSource,
    /// Declared format.
    pub format: DocumentFormat,
    /// Declared extension, normalized to a lowercase `.ext`.
    pub extension: String,
    /// Identifier stamped on every chunk.
    pub doc_id: String,
}

impl DocumentRequest {
    /// Request for a local file; `doc_id` is the file name and the format comes from the extension.
    pub fn local(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        let format = DocumentFormat::from_path(&path)?;
        let doc_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let extension = path
            .extension()
            .map(|ext| normalize_extension(&ext.to_string_lossy()))
            .unwrap_or_else(|| format.suffix().to_string());
        Ok(Self {
            source: DocumentSource::Local(path),
            format,
            extension,
            doc_id,
        })
    }

    /// Request for a remote file with an explicitly declared extension and id.
    pub fn remote(
        url: impl Into<String>,
        extension: &str,
        doc_id: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let format = DocumentFormat::from_extension(extension)?;
        Ok(Self {
            source: DocumentSource::Remote(url.into()),
            format,
            extension: normalize_extension(extension),
            doc_id: doc_id.into(),
        })
    }

    /// Replace the derived document identifier.
    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = doc_id.into();
        self
    }
}

fn normalize_extension(extension: &str) -> String {
    format!(".{}", extension.trim().trim_start_matches('.').to_lowercase())
}

/// Abstraction over the pipeline used by the batch runner and CLI.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Turn one document into chunks.
    async fn process(&self, request: DocumentRequest) -> Result<PipelineOutput, PipelineError>;
}

/// Runs documents through extraction, assembly, and capping.
///
/// The pipeline keeps no state between invocations beyond its settings and collaborator
/// handles, so a single instance can be shared through an `Arc` across tasks.
pub struct IngestionPipeline {
    core: Arc<PipelineCore>,
    fetcher: Arc<dyn DocumentFetcher>,
}

/// Synchronous extraction and chunking state shared with blocking tasks.
struct PipelineCore {
    chunker: RecursiveChunker,
    extractor: TextExtractor,
    max_chunks: Option<usize>,
}

impl IngestionPipeline {
    /// Validate settings and wire the collaborators.
    ///
    /// Fails with [`PipelineError::InvalidChunkConfig`] when the overlap is not smaller than the
    /// chunk size.
    pub fn new(
        settings: PipelineSettings,
        ocr: Arc<dyn OcrEngine>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Result<Self, PipelineError> {
        let config = ChunkConfig::new(settings.chunk_size, settings.chunk_overlap)?;
        tracing::debug!(
            chunk_size = settings.chunk_size,
            chunk_overlap = settings.chunk_overlap,
            max_chunks = ?settings.max_chunks,
            "Initialized ingestion pipeline"
        );
        Ok(Self {
            core: Arc::new(PipelineCore {
                chunker: RecursiveChunker::new(config),
                extractor: TextExtractor::new(ocr),
                max_chunks: settings.max_chunks.filter(|max| *max > 0),
            }),
            fetcher,
        })
    }

    /// Process a document, staging remote bytes to a temporary file first.
    ///
    /// Extraction and chunking run on tokio's blocking pool, so concurrent calls overlap
    /// their PDF parsing and OCR work.
    pub async fn process(&self, request: DocumentRequest) -> Result<PipelineOutput, PipelineError> {
        let DocumentRequest {
            source,
            format,
            extension,
            doc_id,
        } = request;
        let core = Arc::clone(&self.core);

        match source {
            DocumentSource::Local(path) => {
                run_blocking(doc_id, move |doc_id| {
                    core.process_path(&path, format, doc_id)
                })
                .await
            }
            DocumentSource::Remote(url) => {
                let bytes = self.fetcher.fetch(&url).await.map_err(|source| {
                    PipelineError::FetchFailed {
                        url: url.clone(),
                        source,
                    }
                })?;
                let staged = fetch::stage(&bytes, &extension).map_err(|source| {
                    PipelineError::FetchFailed {
                        url: url.clone(),
                        source,
                    }
                })?;
                tracing::debug!(
                    doc_id = %doc_id,
                    path = %staged.path().display(),
                    "Staged remote document"
                );

                run_blocking(doc_id, move |doc_id| {
                    let result = core.process_path(staged.path(), format, doc_id);
                    if let Err(error) = staged.close() {
                        tracing::warn!(doc_id, error = %error, "Failed to remove staged document");
                    }
                    result
                })
                .await
            }
        }
    }

    /// Process a file that is already on local storage, on the calling thread.
    pub fn process_path(
        &self,
        path: &Path,
        format: DocumentFormat,
        doc_id: &str,
    ) -> Result<PipelineOutput, PipelineError> {
        self.core.process_path(path, format, doc_id)
    }
}

/// Run `work` on the blocking pool; a panicking task surfaces as [`PipelineError::TaskFailed`].
///
/// A staged file moved into `work` is still removed when the task unwinds.
async fn run_blocking<F>(doc_id: String, work: F) -> Result<PipelineOutput, PipelineError>
where
    F: FnOnce(&str) -> Result<PipelineOutput, PipelineError> + Send + 'static,
{
    let task_doc_id = doc_id.clone();
    tokio::task::spawn_blocking(move || work(&task_doc_id))
        .await
        .map_err(|source| PipelineError::TaskFailed { doc_id, source })?
}

impl PipelineCore {
    fn process_path(
        &self,
        path: &Path,
        format: DocumentFormat,
        doc_id: &str,
    ) -> Result<PipelineOutput, PipelineError> {
        tracing::info!(doc_id, path = %path.display(), ?format, "Processing document");
        let pages = self
            .extractor
            .extract_file(path, format)
            .map_err(|source| PipelineError::ExtractionFailed {
                doc_id: doc_id.to_string(),
                source,
            })?;

        let AssembledDocument { chunks, skipped } =
            ChunkAssembler::new(&self.chunker).assemble(doc_id, &pages);
        let mut warnings: Vec<PipelineWarning> = skipped
            .into_iter()
            .map(PipelineWarning::ParagraphSkipped)
            .collect();
        tracing::info!(doc_id, chunks = chunks.len(), "Generated chunks");

        let chunks = self.cap(doc_id, chunks, &mut warnings);
        Ok(PipelineOutput {
            doc_id: doc_id.to_string(),
            chunks,
            warnings,
        })
    }

    fn cap(
        &self,
        doc_id: &str,
        mut chunks: Vec<Chunk>,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Vec<Chunk> {
        let Some(max) = self.max_chunks else {
            return chunks;
        };
        if chunks.len() <= max {
            return chunks;
        }

        let produced = chunks.len();
        tracing::warn!(doc_id, produced, kept = max, "Trimming chunks due to limit");
        chunks.truncate(max);
        warnings.push(PipelineWarning::Trimmed {
            produced,
            kept: max,
        });
        chunks
    }
}

#[async_trait]
impl PipelineApi for IngestionPipeline {
    async fn process(&self, request: DocumentRequest) -> Result<PipelineOutput, PipelineError> {
        IngestionPipeline::process(self, request).await
    }
}
