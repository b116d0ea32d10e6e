use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rustydocs::{
    config::Config,
    logging,
    metrics::IngestionMetrics,
    processing::{
        BatchInput, DocumentRequest, HttpFetcher, IngestionPipeline, TesseractCli,
        collect_inputs, run_batch,
    },
    sink::{self, ChunkSink, JsonFileSink},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "rustydocs",
    about = "Turn PDFs, text files, and scans into citation-ready chunks"
)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Overrides {
    /// Maximum chunk length in characters.
    #[arg(long, global = true)]
    chunk_size: Option<usize>,
    /// Characters shared between consecutive chunks.
    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,
    /// Cap on chunks kept per document.
    #[arg(long, global = true)]
    max_chunks: Option<usize>,
    /// Documents processed concurrently.
    #[arg(long, global = true)]
    concurrency: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(chunk_overlap) = self.chunk_overlap {
            config.chunk_overlap = chunk_overlap;
        }
        if let Some(max_chunks) = self.max_chunks {
            config.max_chunks = Some(max_chunks);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Chunk local files; directories are walked recursively.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Output file for the chunk array (`-` for stdout).
        #[arg(long, short, default_value = "-")]
        output: PathBuf,
    },
    /// Download and chunk a single remote document.
    Fetch {
        url: String,
        /// Declared extension, e.g. `.pdf`.
        #[arg(long)]
        ext: String,
        #[arg(long)]
        doc_id: String,
        /// Output file for the chunk array (`-` for stdout).
        #[arg(long, short, default_value = "-")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().context("failed to load configuration")?;
    cli.overrides.apply(&mut config);
    logging::init_tracing(config.log_file.as_deref());
    tracing::debug!(
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        max_chunks = ?config.max_chunks,
        concurrency = config.concurrency,
        "Loaded configuration"
    );

    let ocr = Arc::new(TesseractCli::new(
        config.tesseract_bin.clone(),
        config.ocr_language.clone(),
    ));
    let fetcher =
        Arc::new(HttpFetcher::new(config.fetch_timeout()).context("failed to build HTTP client")?);
    let pipeline = IngestionPipeline::new(config.pipeline_settings(), ocr, fetcher)
        .context("invalid chunking configuration")?;

    let (inputs, output) = match cli.command {
        Command::Ingest { paths, output } => (collect_inputs(&paths), output),
        Command::Fetch {
            url,
            ext,
            doc_id,
            output,
        } => {
            let request = DocumentRequest::remote(url, &ext, doc_id)?;
            (vec![BatchInput::from(request)], output)
        }
    };

    let metrics = IngestionMetrics::new();
    let report = run_batch(&pipeline, inputs, config.concurrency, &metrics).await;
    let documents = report.outcomes.len();
    let succeeded = report.succeeded();

    let mut sink = open_sink(&output)?;
    let chunks = report.into_chunks();
    sink::deliver(sink.as_mut(), &chunks, config.sink_batch_size)
        .await
        .with_context(|| format!("failed to write chunks to {}", output.display()))?;

    let snapshot = metrics.snapshot();
    tracing::info!(
        processed = snapshot.documents_processed,
        failed = snapshot.documents_failed,
        trimmed = snapshot.documents_trimmed,
        chunks = snapshot.chunks_produced,
        "Ingestion summary"
    );

    if documents > 0 && succeeded == 0 {
        bail!("all {documents} documents failed to process");
    }
    Ok(())
}

fn open_sink(output: &Path) -> Result<Box<dyn ChunkSink>> {
    if output == Path::new("-") {
        return Ok(Box::new(JsonFileSink::stdout()));
    }
    let sink = JsonFileSink::create(output)
        .with_context(|| format!("failed to create output file {}", output.display()))?;
    Ok(Box::new(sink))
}
