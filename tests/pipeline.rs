use async_trait::async_trait;
use httpmock::{Method::GET, MockServer};
use rustydocs::metrics::IngestionMetrics;
use rustydocs::processing::{
    BatchInput, Chunk, DocumentFetcher, DocumentFormat, DocumentRequest, ExtractionError,
    FetchError, HttpFetcher, IngestionPipeline, OcrEngine, OcrError, PipelineError,
    PipelineSettings, PipelineWarning, run_batch,
};
use rustydocs::sink::{self, JsonFileSink};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// OCR double that records the path it was handed and whether it existed at that moment.
struct RecordingOcr {
    text: Option<&'static str>,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl RecordingOcr {
    fn returning(text: &'static str) -> Self {
        Self {
            text: Some(text),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            text: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

impl OcrEngine for RecordingOcr {
    fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        self.seen
            .lock()
            .unwrap()
            .push((image.to_path_buf(), image.exists()));
        match self.text {
            Some(text) => Ok(text.to_string()),
            None => Err(OcrError::Spawn {
                binary: "fake-ocr".into(),
                source: std::io::Error::other("engine crashed"),
            }),
        }
    }
}

struct OfflineFetcher;

#[async_trait]
impl DocumentFetcher for OfflineFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Staging(std::io::Error::other("offline")))
    }
}

fn http_fetcher() -> Arc<HttpFetcher> {
    Arc::new(HttpFetcher::new(Duration::from_secs(5)).expect("client"))
}

fn offline_pipeline(settings: PipelineSettings) -> IngestionPipeline {
    IngestionPipeline::new(
        settings,
        Arc::new(RecordingOcr::returning("")),
        Arc::new(OfflineFetcher),
    )
    .expect("pipeline")
}

fn positions(chunks: &[Chunk]) -> Vec<(String, u32, usize, usize)> {
    chunks
        .iter()
        .map(|chunk| {
            (
                chunk.metadata.doc_id.clone(),
                chunk.metadata.page,
                chunk.metadata.paragraph,
                chunk.metadata.chunk_index,
            )
        })
        .collect()
}

#[tokio::test]
async fn local_text_document_produces_tagged_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(
        &path,
        "Rust keeps memory safe without a garbage collector.\n\n\n\nOwnership rules apply.",
    )
    .unwrap();

    let pipeline = offline_pipeline(PipelineSettings::default());
    let output = pipeline
        .process(DocumentRequest::local(&path).expect("request"))
        .await
        .expect("processing");

    assert_eq!(output.doc_id, "notes.txt");
    assert_eq!(output.chunks.len(), 2);
    assert_eq!(
        output.chunks[0].text,
        "Rust keeps memory safe without a garbage collector."
    );
    assert_eq!(output.chunks[1].text, "Ownership rules apply.");
    assert_eq!(
        positions(&output.chunks),
        vec![
            ("notes.txt".to_string(), 1, 0, 0),
            ("notes.txt".to_string(), 1, 1, 0)
        ]
    );
    assert!(
        output
            .chunks
            .iter()
            .all(|chunk| chunk.metadata.source == "notes.txt_page_1")
    );
    assert!(path.exists(), "local input must be left in place");
}

#[tokio::test]
async fn repeated_runs_agree_on_positions_but_not_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("essay.txt");
    let body = "Sentences pile up. Each one adds words. The chunker breaks them apart.\n\n\
                A second paragraph follows with more words to split across chunks.";
    std::fs::write(&path, body).unwrap();

    let settings = PipelineSettings {
        chunk_size: 30,
        chunk_overlap: 5,
        max_chunks: None,
    };
    let pipeline = offline_pipeline(settings);
    let first = pipeline
        .process(DocumentRequest::local(&path).unwrap())
        .await
        .unwrap();
    let second = pipeline
        .process(DocumentRequest::local(&path).unwrap())
        .await
        .unwrap();

    assert!(first.chunks.len() > 2);
    assert_eq!(positions(&first.chunks), positions(&second.chunks));
    let first_texts: Vec<&str> = first.chunks.iter().map(|c| c.text.as_str()).collect();
    let second_texts: Vec<&str> = second.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(first_texts, second_texts);
    for (a, b) in first.chunks.iter().zip(&second.chunks) {
        assert_ne!(a.id, b.id);
    }
    for chunk in &first.chunks {
        assert!(chunk.text.chars().count() <= 30);
    }
}

#[tokio::test]
async fn max_chunks_trims_document_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("many.txt");
    let body = (0..8)
        .map(|n| format!("Paragraph {n}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    std::fs::write(&path, body).unwrap();

    let pipeline = offline_pipeline(PipelineSettings {
        max_chunks: Some(3),
        ..PipelineSettings::default()
    });
    let output = pipeline
        .process(DocumentRequest::local(&path).unwrap())
        .await
        .unwrap();

    let texts: Vec<&str> = output.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Paragraph 0", "Paragraph 1", "Paragraph 2"]);
    assert_eq!(
        output.warnings,
        vec![PipelineWarning::Trimmed {
            produced: 8,
            kept: 3
        }]
    );
}

#[tokio::test]
async fn remote_text_is_downloaded_and_chunked() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/docs/handbook");
            then.status(200)
                .body("Welcome to the handbook.\n\nRead every page.");
        })
        .await;

    let pipeline = IngestionPipeline::new(
        PipelineSettings::default(),
        Arc::new(RecordingOcr::returning("")),
        http_fetcher(),
    )
    .unwrap();
    let request =
        DocumentRequest::remote(server.url("/docs/handbook"), ".txt", "handbook-42").unwrap();
    let output = pipeline.process(request).await.expect("processing");

    mock.assert_async().await;
    let texts: Vec<&str> = output.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Welcome to the handbook.", "Read every page."]);
    assert!(
        output
            .chunks
            .iter()
            .all(|chunk| chunk.metadata.doc_id == "handbook-42")
    );
    assert_eq!(output.chunks[0].metadata.source, "handbook-42_page_1");
}

#[tokio::test]
async fn remote_image_is_staged_for_ocr_and_removed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/scan");
            then.status(200).body(b"\x89PNG fake image bytes".to_vec());
        })
        .await;

    let ocr = Arc::new(RecordingOcr::returning(
        "Invoice 1042\n\nTotal due: 18 EUR",
    ));
    let pipeline =
        IngestionPipeline::new(PipelineSettings::default(), ocr.clone(), http_fetcher()).unwrap();
    let request = DocumentRequest::remote(server.url("/scan"), "PNG", "scan-7").unwrap();
    assert_eq!(request.format, DocumentFormat::Image);

    let output = pipeline.process(request).await.expect("processing");

    let texts: Vec<&str> = output.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Invoice 1042", "Total due: 18 EUR"]);

    let seen = ocr.seen();
    assert_eq!(seen.len(), 1);
    let (staged, existed) = &seen[0];
    assert!(existed, "staged file must exist while OCR runs");
    assert!(staged.to_string_lossy().ends_with(".png"));
    assert!(!staged.exists(), "staged file must be removed afterwards");
}

#[tokio::test]
async fn staged_file_is_removed_when_extraction_fails() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/broken.jpg");
            then.status(200).body(b"not really a jpeg".to_vec());
        })
        .await;

    let ocr = Arc::new(RecordingOcr::failing());
    let pipeline =
        IngestionPipeline::new(PipelineSettings::default(), ocr.clone(), http_fetcher()).unwrap();
    let request = DocumentRequest::remote(server.url("/broken.jpg"), ".jpg", "broken").unwrap();

    let error = pipeline.process(request).await.unwrap_err();
    match error {
        PipelineError::ExtractionFailed { doc_id, source } => {
            assert_eq!(doc_id, "broken");
            assert!(matches!(source, ExtractionError::Ocr(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let seen = ocr.seen();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].0.exists());
}

#[tokio::test]
async fn http_error_status_maps_to_fetch_failed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gone.pdf");
            then.status(404);
        })
        .await;

    let pipeline = IngestionPipeline::new(
        PipelineSettings::default(),
        Arc::new(RecordingOcr::returning("")),
        http_fetcher(),
    )
    .unwrap();
    let url = server.url("/gone.pdf");
    let error = pipeline
        .process(DocumentRequest::remote(url.clone(), ".pdf", "gone").unwrap())
        .await
        .unwrap_err();

    assert!(error.is_retryable());
    match error {
        PipelineError::FetchFailed { url: failed, source } => {
            assert_eq!(failed, url);
            assert!(matches!(
                source,
                FetchError::UnexpectedStatus { status, .. } if status.as_u16() == 404
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unsupported_format_is_rejected_before_any_download() {
    let error = DocumentRequest::remote("http://127.0.0.1:9/memo", ".docx", "memo").unwrap_err();
    match error {
        PipelineError::UnsupportedFormat { extension } => assert_eq!(extension, ".docx"),
        other => panic!("unexpected error: {other:?}"),
    }
}

/// OCR double that blocks its thread the way a real `tesseract` run does.
struct SlowOcr(Duration);

impl OcrEngine for SlowOcr {
    fn recognize(&self, _image: &Path) -> Result<String, OcrError> {
        std::thread::sleep(self.0);
        Ok("Scanned page.".into())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batch_overlaps_blocking_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let inputs: Vec<BatchInput> = (0..4)
        .map(|n| {
            let path = dir.path().join(format!("scan-{n}.png"));
            std::fs::write(&path, b"\x89PNG").unwrap();
            BatchInput::local(path)
        })
        .collect();
    let ocr_time = Duration::from_millis(400);
    let pipeline = IngestionPipeline::new(
        PipelineSettings::default(),
        Arc::new(SlowOcr(ocr_time)),
        Arc::new(OfflineFetcher),
    )
    .unwrap();
    let metrics = IngestionMetrics::new();

    let started = std::time::Instant::now();
    let report = run_batch(&pipeline, inputs, 4, &metrics).await;
    let elapsed = started.elapsed();

    assert_eq!(report.succeeded(), 4);
    assert!(
        elapsed < ocr_time * 3,
        "four documents took {elapsed:?}; extraction ran serially"
    );
}

#[tokio::test]
async fn batch_of_files_streams_into_json_sink() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "First file.\n\nTwo paragraphs.").unwrap();
    std::fs::write(dir.path().join("b.docx"), "ignored").unwrap();
    std::fs::write(dir.path().join("c.txt"), [0xffu8, 0xfe]).unwrap();
    std::fs::write(dir.path().join("d.txt"), "Last file.").unwrap();

    let inputs: Vec<BatchInput> = ["a.txt", "b.docx", "c.txt", "d.txt"]
        .iter()
        .map(|name| BatchInput::local(dir.path().join(name)))
        .collect();
    let metrics = IngestionMetrics::new();
    let pipeline = offline_pipeline(PipelineSettings::default());

    let report = run_batch(&pipeline, inputs, 3, &metrics).await;
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 2);
    let failed: Vec<&str> = report.failures().map(|(doc_id, _)| doc_id).collect();
    assert_eq!(failed, vec!["b.docx", "c.txt"]);

    let out_path = dir.path().join("out").join("all_chunks.json");
    let mut json_sink = JsonFileSink::create(&out_path).unwrap();
    let chunks = report.into_chunks();
    let written = sink::deliver(&mut json_sink, &chunks, 2).await.unwrap();
    assert_eq!(written, 3);

    let parsed: Vec<Chunk> =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(parsed, chunks);
    let docs: Vec<&str> = parsed
        .iter()
        .map(|chunk| chunk.metadata.doc_id.as_str())
        .collect();
    assert_eq!(docs, vec!["a.txt", "a.txt", "d.txt"]);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.documents_processed, 2);
    assert_eq!(snapshot.documents_failed, 2);
    assert_eq!(snapshot.chunks_produced, 3);
}
