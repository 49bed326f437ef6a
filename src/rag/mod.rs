//! Retrieval-augmented answering.
//!
//! [`Retriever`] turns a query into ranked display snippets,
//! [`AnswerSynthesizer`] grounds a generation backend on the retrieved
//! chunks, and [`generation`] holds the backend contract plus its HTTP
//! client.

pub mod generation;
pub mod retriever;
pub mod synthesizer;

pub use generation::{GenerationBackend, GenerationError, OllamaClient};
pub use retriever::{RetrievedSnippet, Retriever};
pub use synthesizer::{Answer, AnswerSynthesizer, NO_CONTEXT_ANSWER, build_prompt};

use thiserror::Error;

use crate::documents::StoreError;

/// Errors surfaced by search and ask.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Document store error: {0}")]
    Store(StoreError),

    #[error("Generation backend unavailable: {0}")]
    GenerationUnavailable(#[from] GenerationError),
}

impl From<StoreError> for RagError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            other => Self::Store(other),
        }
    }
}

impl RagError {
    /// Short machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Store(_) => "index_unavailable",
            Self::GenerationUnavailable(_) => "generation_unavailable",
        }
    }
}

pub(crate) fn validate_k(k: usize) -> Result<(), RagError> {
    if k == 0 {
        return Err(RagError::InvalidRequest("k must be at least 1".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_query(text: &str, what: &str) -> Result<(), RagError> {
    if text.trim().is_empty() {
        return Err(RagError::InvalidRequest(format!("{what} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_invalid_request_maps_to_invalid_request() {
        let err: RagError = StoreError::InvalidRequest("k".into()).into();
        assert!(matches!(err, RagError::InvalidRequest(_)));
        assert_eq!(err.kind(), "invalid_request");

        let err: RagError = StoreError::Unavailable("down".into()).into();
        assert_eq!(err.kind(), "index_unavailable");
    }

    #[test]
    fn test_validation() {
        assert!(validate_k(0).is_err());
        assert!(validate_k(1).is_ok());
        assert!(validate_query("   ", "query").is_err());
        assert!(validate_query("fox", "query").is_ok());
    }
}
