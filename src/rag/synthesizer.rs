//! Grounded answer synthesis.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::generation::GenerationBackend;
use super::retriever::Retriever;
use super::{RagError, validate_query};
use crate::documents::truncate_with_ellipsis;

/// Answer returned when retrieval finds no grounding context.
pub const NO_CONTEXT_ANSWER: &str = "I don't know.";

/// Default display length for answer snippets.
pub const DEFAULT_ANSWER_SNIPPET_CHARS: usize = 120;

/// An answer with the material it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    /// Distinct source filenames of the retrieved chunks.
    pub sources: Vec<String>,
    /// Retrieved chunk contents in rank order, truncated for display.
    pub snippets: Vec<String>,
}

impl Answer {
    fn no_context() -> Self {
        Self {
            answer: NO_CONTEXT_ANSWER.to_string(),
            sources: Vec::new(),
            snippets: Vec::new(),
        }
    }
}

/// Build the Markdown-only prompt around the retrieved context.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant.\n\
         Answer the question using only the context below.\n\
         Return answer in clean, well-structured Markdown.\n\
         \n\
         You may use:\n\
         - headings\n\
         - bullet points\n\
         - short paragraphs\n\
         - tables\n\
         \n\
         Avoid HTML.\n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Answer:"
    )
}

/// Retrieves context for a question and asks the generation backend.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    retriever: Retriever,
    backend: Arc<dyn GenerationBackend>,
    snippet_chars: usize,
}

impl AnswerSynthesizer {
    pub fn new(retriever: Retriever, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            retriever,
            backend,
            snippet_chars: DEFAULT_ANSWER_SNIPPET_CHARS,
        }
    }

    pub fn with_snippet_chars(mut self, snippet_chars: usize) -> Self {
        self.snippet_chars = snippet_chars;
        self
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    /// Answer `question` from the top-`k` retrieved chunks.
    ///
    /// Never calls the backend when nothing is retrieved. Backend failures
    /// propagate as `GenerationUnavailable`.
    pub async fn answer(
        &self,
        question: &str,
        k: usize,
        temperature: f32,
    ) -> Result<Answer, RagError> {
        validate_query(question, "question")?;
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(RagError::InvalidRequest(format!(
                "temperature must be a non-negative number, got {temperature}"
            )));
        }

        let chunks = self.retriever.retrieve_chunks(question, k).await?;
        if chunks.is_empty() {
            crate::debug_event!("rag", "no context", "answering with sentinel");
            return Ok(Answer::no_context());
        }

        let context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_prompt(&context, question);

        let answer = self.backend.generate(&prompt, temperature).await?;

        let sources = chunks
            .iter()
            .map(|c| c.metadata.filename.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let snippets = chunks
            .iter()
            .map(|c| truncate_with_ellipsis(&c.content, self.snippet_chars))
            .collect();

        crate::log_event!("rag", "answered", "{} chunks of context", chunks.len());
        Ok(Answer {
            answer,
            sources,
            snippets,
        })
    }
}
