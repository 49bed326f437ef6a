//! Similarity search with display-length snippets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{RagError, validate_k, validate_query};
use crate::documents::{DocumentStore, ScoredChunk, truncate_with_ellipsis};

/// Default display length for search snippets.
pub const DEFAULT_SNIPPET_CHARS: usize = 400;

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSnippet {
    pub snippet: String,
    pub filename: String,
    pub idx: usize,
    pub distance: f32,
}

/// Wraps a document store query with request validation and truncation.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn DocumentStore>,
    snippet_chars: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
        }
    }

    pub fn with_snippet_chars(mut self, snippet_chars: usize) -> Self {
        self.snippet_chars = snippet_chars;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Top-`k` chunks for `query`, untruncated.
    ///
    /// A sparse index yields fewer than `k` results without error.
    pub async fn retrieve_chunks(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        validate_k(k)?;
        validate_query(query, "query")?;
        Ok(self.store.query(query, k).await?)
    }

    /// Top-`k` hits for `query` as display snippets.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedSnippet>, RagError> {
        let chunks = self.retrieve_chunks(query, k).await?;
        tracing::debug!(target: "rag", "retrieved {} of {k} requested chunks", chunks.len());

        Ok(chunks
            .into_iter()
            .map(|chunk| RetrievedSnippet {
                snippet: truncate_with_ellipsis(&chunk.content, self.snippet_chars),
                filename: chunk.metadata.filename,
                idx: chunk.metadata.sequence_index,
                distance: chunk.distance,
            })
            .collect())
    }
}
