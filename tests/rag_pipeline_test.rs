//! End-to-end ingestion, retrieval and answering with a recording backend.

use std::sync::Arc;

use async_trait::async_trait;
use docqa::documents::{HashingEmbedder, VectorCollection};
use docqa::extract::ExtractorRegistry;
use docqa::rag::{GenerationBackend, GenerationError, NO_CONTEXT_ANSWER};
use docqa::{IngestStatus, RagError, RagService, Settings, UploadedFile};
use parking_lot::Mutex;

#[derive(Default)]
struct RecordingBackend {
    calls: Mutex<Vec<String>>,
    unavailable: bool,
}

#[async_trait]
impl GenerationBackend for RecordingBackend {
    async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String, GenerationError> {
        self.calls.lock().push(prompt.to_string());
        if self.unavailable {
            return Err(GenerationError::Status {
                status: 503,
                body: "model loading".to_string(),
            });
        }
        Ok("## Reset\n\nHold the button for ten seconds.".to_string())
    }

    fn model(&self) -> &str {
        "recording-model"
    }
}

fn service_with(backend: Arc<RecordingBackend>, settings: &Settings) -> RagService {
    let store = Arc::new(VectorCollection::in_memory(
        "docs",
        Arc::new(HashingEmbedder::default()),
    ));
    RagService::new(settings, store, backend, ExtractorRegistry::default())
}

fn small_chunks() -> Settings {
    let mut settings = Settings::default();
    settings.chunking.chunk_size = 60;
    settings.chunking.overlap = 10;
    settings
}

const MANUAL: &str = "To reset the router press and hold the reset button for ten seconds. \
    The lights will blink twice. Firmware updates are installed automatically at night. \
    The warranty covers defects for two years from the date of purchase.";

#[tokio::test]
async fn test_ask_on_empty_index_never_calls_backend() {
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(backend.clone(), &Settings::default());

    let answer = service.ask("how do I reset?", None, None).await.unwrap();
    assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());
    assert!(backend.calls.lock().is_empty());
}

#[tokio::test]
async fn test_ingest_then_ask_grounds_prompt() {
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(backend.clone(), &small_chunks());

    let outcomes = service
        .ingest(vec![
            UploadedFile::new("router.txt", Some("text/plain".into()), MANUAL.as_bytes().to_vec()),
            UploadedFile::new("empty.txt", None, Vec::new()),
        ])
        .await;
    assert_eq!(outcomes[0].status, IngestStatus::Success);
    assert!(outcomes[0].chunks > 1);
    assert_eq!(outcomes[1].status, IngestStatus::Empty);

    let answer = service
        .ask("press and hold the reset button", Some(2), Some(0.2))
        .await
        .unwrap();
    assert_eq!(answer.answer, "## Reset\n\nHold the button for ten seconds.");
    assert_eq!(answer.sources, vec!["router.txt".to_string()]);
    assert_eq!(answer.snippets.len(), 2);

    let calls = backend.calls.lock();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("reset button"));
    assert!(calls[0].ends_with("Question:\npress and hold the reset button\n\nAnswer:"));
}

#[tokio::test]
async fn test_search_reports_ranked_snippets() {
    let service = service_with(Arc::new(RecordingBackend::default()), &small_chunks());
    service
        .ingest(vec![UploadedFile::new("router.txt", None, MANUAL.as_bytes().to_vec())])
        .await;

    let hits = service.search("warranty defects two years", Some(3)).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits[0].snippet.contains("warranty") || hits[0].snippet.contains("years"));
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!(hits.iter().all(|h| h.filename == "router.txt"));
}

#[tokio::test]
async fn test_backend_failure_is_generation_unavailable() {
    let backend = Arc::new(RecordingBackend {
        unavailable: true,
        ..Default::default()
    });
    let service = service_with(backend, &small_chunks());
    service
        .ingest(vec![UploadedFile::new("router.txt", None, MANUAL.as_bytes().to_vec())])
        .await;

    let err = service.ask("reset", None, None).await.unwrap_err();
    assert!(matches!(err, RagError::GenerationUnavailable(_)));
}

#[tokio::test]
async fn test_reset_empties_everything() {
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(backend.clone(), &small_chunks());
    service
        .ingest(vec![UploadedFile::new("router.txt", None, MANUAL.as_bytes().to_vec())])
        .await;

    service.reset().await.unwrap();

    assert_eq!(service.stats().await.unwrap().total_chunks, 0);
    assert!(service.documents(None).await.unwrap().is_empty());
    assert_eq!(
        service.ask("reset", None, None).await.unwrap().answer,
        NO_CONTEXT_ANSWER
    );
    assert!(backend.calls.lock().is_empty());
}
