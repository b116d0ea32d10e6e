//! Document processing pipeline: extraction, chunking, metadata tagging, and orchestration.

pub mod assemble;
pub mod batch;
pub mod chunking;
pub mod extract;
pub mod fetch;
mod service;
pub mod types;

pub use batch::{BatchInput, BatchReport, DocumentOutcome, collect_inputs, run_batch};
pub use extract::{DocumentFormat, ExtractionError, OcrEngine, OcrError, TesseractCli};
pub use fetch::{DocumentFetcher, FetchError, HttpFetcher};
pub use service::{
    DocumentRequest, DocumentSource, IngestionPipeline, PipelineApi, PipelineSettings,
};
pub use types::{
    Chunk, ChunkMetadata, ChunkingError, Page, PipelineError, PipelineOutput, PipelineWarning,
    SkippedParagraph,
};
