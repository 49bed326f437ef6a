//! Batch ingestion of uploaded files.
//!
//! Each file is classified, extracted, chunked and stored independently. A
//! failing file is reported in its own outcome and never aborts the batch.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::documents::{Chunk, ChunkingConfig, Chunker, DocumentStore, StoreError};
use crate::extract::{self, ExtractError, ExtractorRegistry};

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data,
        }
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-file result status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStatus {
    Success,
    /// No extractable text; nothing was stored.
    Empty,
    Error(String),
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Empty => f.write_str("empty"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

impl Serialize for IngestStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result entry for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub filename: String,
    pub status: IngestStatus,
    pub chunks: usize,
}

/// Extract, chunk and store uploads.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn DocumentStore>,
    extractors: ExtractorRegistry,
    chunker: Arc<dyn Chunker>,
    chunking: ChunkingConfig,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extractors: ExtractorRegistry,
        chunker: Arc<dyn Chunker>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            extractors,
            chunker,
            chunking,
        }
    }

    /// Ingest every file, returning one outcome per input in input order.
    pub async fn ingest_batch(&self, files: Vec<UploadedFile>) -> Vec<IngestOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            outcomes.push(self.ingest_file(file).await);
        }
        outcomes
    }

    /// Ingest a single file; failures are captured in the outcome.
    pub async fn ingest_file(&self, file: UploadedFile) -> IngestOutcome {
        let filename = file.filename.clone();
        match self.try_ingest(file).await {
            Ok(0) => {
                crate::debug_event!("ingest", "empty", "{filename}");
                IngestOutcome {
                    filename,
                    status: IngestStatus::Empty,
                    chunks: 0,
                }
            }
            Ok(chunks) => {
                crate::log_event!("ingest", "stored", "{chunks} chunks from {filename}");
                IngestOutcome {
                    filename,
                    status: IngestStatus::Success,
                    chunks,
                }
            }
            Err(e) => {
                tracing::warn!(target: "ingest", "failed to ingest {filename}: {e}");
                IngestOutcome {
                    filename,
                    status: IngestStatus::Error(e.to_string()),
                    chunks: 0,
                }
            }
        }
    }

    async fn try_ingest(&self, file: UploadedFile) -> Result<usize, IngestError> {
        let source_type = extract::classify(&file.filename, file.content_type.as_deref());
        let text = self.extractors.extract(source_type, file.data).await?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(0);
        }

        let pieces = self.chunker.chunk(text, &self.chunking);
        if pieces.is_empty() {
            return Ok(0);
        }

        let chunks = Chunk::sequence(&file.filename, source_type, pieces);
        let ids = self.store.add(chunks).await?;
        Ok(ids.len())
    }
}
