//! Destinations for finished chunks.
//!
//! Embedding and vector-store indexing live behind [`ChunkSink`]. The bundled [`JsonFileSink`]
//! writes the chunk stream as a JSON array, one object per chunk in wire format.

use async_trait::async_trait;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::processing::Chunk;

/// Default number of chunks handed to a sink per call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Errors raised by chunk sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Underlying writer failed.
    #[error("failed to write chunks: {0}")]
    Io(#[from] io::Error),
    /// Chunk could not be serialized.
    #[error("failed to serialize chunk: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Sink was used after [`ChunkSink::finish`].
    #[error("sink already finished")]
    Finished,
}

/// Accepts ordered chunk batches for embedding and storage.
#[async_trait]
pub trait ChunkSink: Send {
    /// Accept the next batch, preserving order across calls.
    async fn write_batch(&mut self, batch: &[Chunk]) -> Result<(), SinkError>;

    /// Flush and close the sink, returning the number of chunks accepted.
    async fn finish(&mut self) -> Result<usize, SinkError>;
}

/// Streams chunks into a JSON array.
pub struct JsonFileSink {
    writer: Box<dyn Write + Send>,
    written: usize,
    finished: bool,
}

impl JsonFileSink {
    /// Create (or truncate) `path`, creating parent directories as needed.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self::from_writer(Box::new(BufWriter::new(file))))
    }

    /// Write to standard output.
    pub fn stdout() -> Self {
        Self::from_writer(Box::new(BufWriter::new(io::stdout())))
    }

    /// Write to an arbitrary writer.
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer,
            written: 0,
            finished: false,
        }
    }
}

#[async_trait]
impl ChunkSink for JsonFileSink {
    async fn write_batch(&mut self, batch: &[Chunk]) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        for chunk in batch {
            let lead = if self.written == 0 { "[\n" } else { ",\n" };
            self.writer.write_all(lead.as_bytes())?;
            serde_json::to_writer_pretty(&mut self.writer, chunk)?;
            self.written += 1;
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<usize, SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        let tail = if self.written == 0 { "[]\n" } else { "\n]\n" };
        self.writer.write_all(tail.as_bytes())?;
        self.writer.flush()?;
        self.finished = true;
        Ok(self.written)
    }
}

/// Push `chunks` into `sink` in batches of `batch_size`, then finish it.
pub async fn deliver<S>(
    sink: &mut S,
    chunks: &[Chunk],
    batch_size: usize,
) -> Result<usize, SinkError>
where
    S: ChunkSink + ?Sized,
{
    let batch_size = batch_size.max(1);
    let total_batches = chunks.len().div_ceil(batch_size);
    for (index, batch) in chunks.chunks(batch_size).enumerate() {
        sink.write_batch(batch).await?;
        tracing::info!(
            batch = index + 1,
            total_batches,
            chunks = batch.len(),
            "Delivered chunk batch"
        );
    }
    let accepted = sink.finish().await?;
    tracing::info!(chunks = accepted, "All chunks delivered");
    Ok(accepted)
}
