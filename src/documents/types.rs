//! Core types for document chunks and their metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a stored chunk.
///
/// Generated at ingestion time and never reused, not even across a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(Uuid);

impl ChunkId {
    /// Allocate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of upload a chunk was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Text,
    Pdf,
    Image,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata persisted next to every chunk.
///
/// Serialized with the wire schema `{filename, type, idx}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Name of the originating upload.
    pub filename: String,

    /// Kind of the originating upload.
    #[serde(rename = "type")]
    pub source_type: SourceType,

    /// Zero-based position within the source document's chunk sequence.
    #[serde(rename = "idx")]
    pub sequence_index: usize,
}

impl ChunkMetadata {
    pub fn new(filename: impl Into<String>, source_type: SourceType, sequence_index: usize) -> Self {
        Self {
            filename: filename.into(),
            source_type,
            sequence_index,
        }
    }
}

/// A contiguous window of a document's normalized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier, assigned by the store on `add` when absent.
    pub id: Option<ChunkId>,

    /// The text content of this chunk.
    pub content: String,

    /// Source and ordering metadata.
    pub metadata: ChunkMetadata,

    /// Precomputed embedding, if the caller already has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Build the chunk sequence for one ingested document.
    ///
    /// All chunks share `filename`/`source_type` and get contiguous
    /// sequence indices starting at 0.
    pub fn sequence(
        filename: &str,
        source_type: SourceType,
        contents: impl IntoIterator<Item = String>,
    ) -> Vec<Self> {
        contents
            .into_iter()
            .enumerate()
            .map(|(idx, content)| Self {
                id: None,
                content,
                metadata: ChunkMetadata::new(filename, source_type, idx),
                embedding: None,
            })
            .collect()
    }

    /// Get the length of the content in characters.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// A stored chunk returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub id: ChunkId,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query (lower is closer).
    pub distance: f32,
}

/// Per-filename aggregate shown in document listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub chunks: usize,
}

/// Aggregate chunk metadata into per-document counts, sorted by filename.
pub fn summarize_documents<'a>(
    metadata: impl IntoIterator<Item = &'a ChunkMetadata>,
    limit: Option<usize>,
) -> Vec<DocumentSummary> {
    let mut counts = std::collections::BTreeMap::<&str, usize>::new();
    for meta in metadata {
        *counts.entry(meta.filename.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(filename, chunks)| DocumentSummary {
            filename: filename.to_string(),
            chunks,
        })
        .collect()
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_end, _)) => format!("{}...", &text[..byte_end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_wire_schema() {
        let meta = ChunkMetadata::new("a.pdf", SourceType::Pdf, 2);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"filename": "a.pdf", "type": "pdf", "idx": 2})
        );

        let back: ChunkMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_metadata_rejects_unknown_type() {
        let result: Result<ChunkMetadata, _> =
            serde_json::from_value(serde_json::json!({"filename": "x", "type": "video", "idx": 0}));
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_sequence_indices() {
        let chunks = Chunk::sequence(
            "notes.txt",
            SourceType::Text,
            vec!["one".to_string(), "two".to_string(), "three".to_string()],
        );

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.sequence_index, i);
            assert_eq!(chunk.metadata.filename, "notes.txt");
            assert!(chunk.id.is_none());
        }
    }

    #[test]
    fn test_summarize_documents_sorted_and_limited() {
        let metas = vec![
            ChunkMetadata::new("b.png", SourceType::Image, 0),
            ChunkMetadata::new("a.pdf", SourceType::Pdf, 0),
            ChunkMetadata::new("a.pdf", SourceType::Pdf, 1),
            ChunkMetadata::new("a.pdf", SourceType::Pdf, 2),
        ];

        let docs = summarize_documents(&metas, None);
        assert_eq!(
            docs,
            vec![
                DocumentSummary { filename: "a.pdf".into(), chunks: 3 },
                DocumentSummary { filename: "b.png".into(), chunks: 1 },
            ]
        );

        let limited = summarize_documents(&metas, Some(1));
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].filename, "a.pdf");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
        // Multi-byte characters are never split
        assert_eq!(truncate_with_ellipsis("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_chunk_ids_unique() {
        let a = ChunkId::generate();
        let b = ChunkId::generate();
        assert_ne!(a, b);
    }
}
