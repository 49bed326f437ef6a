//! Document store contract.
//!
//! The store exclusively owns chunk persistence. Callers hold it behind an
//! `Arc<dyn DocumentStore>`; `reset()` hands back a new [`Generation`] rather
//! than invalidating references callers already hold.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::embedding::EmbeddingError;
use super::types::{Chunk, ChunkId, ChunkMetadata, ScoredChunk};

/// Errors from document storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Collection was built with embedding scheme '{stored}' but '{current}' is configured; reset the collection to switch"
    )]
    EmbeddingSchemeMismatch { stored: String, current: String },

    #[error("Collection generation {0} was reset while the operation was in flight")]
    StaleGeneration(Generation),

    #[error("Chunk id already stored: {0}")]
    DuplicateId(ChunkId),

    #[error("Invalid chunk metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Index unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this failure means the index could not be read at all.
    ///
    /// Read-only listing paths fall back to empty results for these kinds
    /// and only these.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Identifies one lifetime of a collection, bumped by every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub const INITIAL: Generation = Generation(1);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Persistent chunk index with similarity search.
///
/// Implementations must allow concurrent `add`/`query` calls. `reset` is
/// the single destructive operation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist chunks atomically for this call, assigning fresh ids to
    /// chunks that have none and embedding chunks without a precomputed
    /// vector. Never overwrites an existing id.
    async fn add(&self, chunks: Vec<Chunk>) -> StoreResult<Vec<ChunkId>>;

    /// Return up to `k` nearest chunks to `text`, closest first. Equal
    /// distances keep insertion order.
    async fn query(&self, text: &str, k: usize) -> StoreResult<Vec<ScoredChunk>>;

    /// Metadata for every stored chunk, in insertion order.
    async fn list_metadata(&self) -> StoreResult<Vec<ChunkMetadata>>;

    /// Total number of stored chunks.
    async fn count(&self) -> StoreResult<usize>;

    /// Destroy every stored chunk and start a new, empty generation.
    async fn reset(&self) -> StoreResult<Generation>;

    /// Generation currently served.
    fn generation(&self) -> Generation;

    /// Label of the embedding scheme the collection is bound to.
    fn embedding_label(&self) -> String;
}
