//! Composition root shared by the HTTP server and the CLI.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::Settings;
use crate::documents::{
    self, DocumentStore, DocumentSummary, FixedWindowChunker, Generation, StoreError,
    summarize_documents,
};
use crate::extract::ExtractorRegistry;
use crate::ingest::{IngestOutcome, Ingestor, UploadedFile};
use crate::rag::{
    Answer, AnswerSynthesizer, GenerationBackend, OllamaClient, RagError, RetrievedSnippet,
    Retriever,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to open document store: {0}")]
    Store(#[from] StoreError),
}

/// Counters reported by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_chunks: usize,
    pub model: String,
    pub embedding: String,
}

/// Request-scoped defaults taken from settings.
#[derive(Debug, Clone, Copy)]
struct Defaults {
    search_k: usize,
    ask_k: usize,
    temperature: f32,
    documents_limit: usize,
}

/// Every operation the service exposes, wired to one document store.
#[derive(Clone)]
pub struct RagService {
    store: Arc<dyn DocumentStore>,
    ingestor: Ingestor,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    defaults: Defaults,
}

impl RagService {
    /// Open the configured collection and generation backend.
    pub fn from_settings(settings: &Settings) -> Result<Self, ServiceError> {
        settings.validate().map_err(ServiceError::Config)?;

        let store: Arc<dyn DocumentStore> = Arc::new(documents::open_from_settings(settings)?);
        let backend: Arc<dyn GenerationBackend> =
            Arc::new(OllamaClient::from_config(&settings.generation));
        let extractors = ExtractorRegistry::with_tesseract(&settings.extract.ocr_command);

        Ok(Self::new(settings, store, backend, extractors))
    }

    /// Assemble a service from explicit collaborators.
    pub fn new(
        settings: &Settings,
        store: Arc<dyn DocumentStore>,
        backend: Arc<dyn GenerationBackend>,
        extractors: ExtractorRegistry,
    ) -> Self {
        let retrieval = &settings.retrieval;
        let ingestor = Ingestor::new(
            store.clone(),
            extractors,
            Arc::new(FixedWindowChunker::new()),
            settings.chunking.clone(),
        );
        let retriever = Retriever::new(store.clone()).with_snippet_chars(retrieval.snippet_chars);
        let synthesizer = AnswerSynthesizer::new(Retriever::new(store.clone()), backend)
            .with_snippet_chars(retrieval.answer_snippet_chars);

        Self {
            store,
            ingestor,
            retriever,
            synthesizer,
            defaults: Defaults {
                search_k: retrieval.search_k,
                ask_k: retrieval.ask_k,
                temperature: retrieval.temperature,
                documents_limit: retrieval.documents_limit,
            },
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn ingest(&self, files: Vec<UploadedFile>) -> Vec<IngestOutcome> {
        self.ingestor.ingest_batch(files).await
    }

    pub async fn search(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<RetrievedSnippet>, RagError> {
        self.retriever
            .retrieve(query, k.unwrap_or(self.defaults.search_k))
            .await
    }

    pub async fn ask(
        &self,
        question: &str,
        k: Option<usize>,
        temperature: Option<f32>,
    ) -> Result<Answer, RagError> {
        self.synthesizer
            .answer(
                question,
                k.unwrap_or(self.defaults.ask_k),
                temperature.unwrap_or(self.defaults.temperature),
            )
            .await
    }

    /// Chunk count and identifiers. An unavailable index reports zero.
    pub async fn stats(&self) -> Result<Stats, RagError> {
        let total_chunks = match self.store.count().await {
            Ok(count) => count,
            Err(e) if e.is_unavailable() => {
                tracing::warn!(target: "service", "index unavailable, reporting 0 chunks: {e}");
                0
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Stats {
            total_chunks,
            model: self.synthesizer.backend().model().to_string(),
            embedding: self.store.embedding_label(),
        })
    }

    /// Per-document chunk counts sorted by filename. An unavailable index
    /// lists nothing.
    pub async fn documents(&self, limit: Option<usize>) -> Result<Vec<DocumentSummary>, RagError> {
        let metadata = match self.store.list_metadata().await {
            Ok(metadata) => metadata,
            Err(e) if e.is_unavailable() => {
                tracing::warn!(target: "service", "index unavailable, listing no documents: {e}");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let limit = limit.unwrap_or(self.defaults.documents_limit);
        Ok(summarize_documents(&metadata, Some(limit)))
    }

    pub async fn reset(&self) -> Result<Generation, RagError> {
        let generation = self.store.reset().await?;
        crate::log_event!("store", "reset", "now serving generation {generation}");
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{
        Chunk, ChunkMetadata, HashingEmbedder, ScoredChunk, SourceType, StoreResult,
        VectorCollection,
    };
    use crate::rag::GenerationError;
    use async_trait::async_trait;

    struct EchoBackend;

    #[async_trait]
    impl GenerationBackend for EchoBackend {
        async fn generate(&self, _prompt: &str, _t: f32) -> Result<String, GenerationError> {
            Ok("echo".to_string())
        }

        fn model(&self) -> &str {
            "echo-model"
        }
    }

    /// A store whose backing index cannot be read.
    struct UnavailableStore;

    #[async_trait]
    impl DocumentStore for UnavailableStore {
        async fn add(&self, _chunks: Vec<Chunk>) -> StoreResult<Vec<documents::ChunkId>> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn query(&self, _text: &str, _k: usize) -> StoreResult<Vec<ScoredChunk>> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn list_metadata(&self) -> StoreResult<Vec<ChunkMetadata>> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn count(&self) -> StoreResult<usize> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn reset(&self) -> StoreResult<Generation> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn generation(&self) -> Generation {
            Generation::INITIAL
        }
        fn embedding_label(&self) -> String {
            "none".to_string()
        }
    }

    fn service(store: Arc<dyn DocumentStore>) -> RagService {
        RagService::new(
            &Settings::default(),
            store,
            Arc::new(EchoBackend),
            ExtractorRegistry::default(),
        )
    }

    #[tokio::test]
    async fn test_stats_and_documents_degrade_when_unavailable() {
        let svc = service(Arc::new(UnavailableStore));

        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 0);
        assert_eq!(stats.model, "echo-model");
        assert!(svc.documents(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_does_not_degrade() {
        let svc = service(Arc::new(UnavailableStore));
        let err = svc.search("anything", None).await.unwrap_err();
        assert!(matches!(err, RagError::Store(_)));
    }

    #[tokio::test]
    async fn test_documents_listing_sorted_and_limited() {
        let store = Arc::new(VectorCollection::in_memory(
            "test",
            Arc::new(HashingEmbedder::default()),
        ));
        store
            .add(Chunk::sequence(
                "b.png",
                SourceType::Image,
                vec!["scanned".to_string()],
            ))
            .await
            .unwrap();
        store
            .add(Chunk::sequence(
                "a.pdf",
                SourceType::Pdf,
                vec!["one".to_string(), "two".to_string(), "three".to_string()],
            ))
            .await
            .unwrap();

        let svc = service(store);
        let docs = svc.documents(None).await.unwrap();
        assert_eq!(
            docs,
            vec![
                DocumentSummary {
                    filename: "a.pdf".into(),
                    chunks: 3
                },
                DocumentSummary {
                    filename: "b.png".into(),
                    chunks: 1
                },
            ]
        );
        assert_eq!(svc.documents(Some(1)).await.unwrap().len(), 1);

        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 4);
        assert_eq!(stats.embedding, "hashing-256");
    }

    #[tokio::test]
    async fn test_reset_then_count_is_zero() {
        let store = Arc::new(VectorCollection::in_memory(
            "test",
            Arc::new(HashingEmbedder::default()),
        ));
        let svc = service(store);
        svc.ingest(vec![UploadedFile::new("a.txt", None, b"alpha beta".to_vec())])
            .await;
        assert_eq!(svc.stats().await.unwrap().total_chunks, 1);

        let generation = svc.reset().await.unwrap();
        assert_eq!(generation, Generation::INITIAL.next());
        assert_eq!(svc.stats().await.unwrap().total_chunks, 0);
    }
}
