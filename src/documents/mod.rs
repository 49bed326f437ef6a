//! Document chunking, embedding and storage for retrieval.
//!
//! This module provides:
//! - Deterministic overlapping chunking of extracted text
//! - Embedding generators (fastembed or an offline hashing scheme)
//! - The `DocumentStore` contract and a persistent vector collection

pub mod chunker;
pub mod collection;
pub mod config;
pub mod embedding;
pub mod store;
pub mod types;

pub use chunker::{Chunker, FixedWindowChunker, normalize_whitespace};
pub use collection::VectorCollection;
pub use config::ChunkingConfig;
pub use embedding::{
    EmbeddingError, EmbeddingGenerator, FastEmbedGenerator, HASHING_MODEL, HashingEmbedder,
    cosine_distance,
};
pub use store::{DocumentStore, Generation, StoreError, StoreResult};
pub use types::{
    Chunk, ChunkId, ChunkMetadata, DocumentSummary, ScoredChunk, SourceType, summarize_documents,
    truncate_with_ellipsis,
};

use std::sync::Arc;

use crate::config::Settings;

/// Open the configured collection with the configured embedding scheme.
pub fn open_from_settings(settings: &Settings) -> StoreResult<VectorCollection> {
    let generator = embedding::from_settings(
        &settings.embedding.model,
        settings.embedding.cache_dir.clone(),
    )?;
    let generator: Arc<dyn EmbeddingGenerator> = Arc::from(generator);

    let index_dir = settings.index_dir();
    let collection = VectorCollection::open(&index_dir, &settings.collection, generator)?;
    tracing::info!(
        target: "documents",
        "opened collection {} at {}",
        settings.collection,
        index_dir.display()
    );
    Ok(collection)
}
