//! Document chunking.
//!
//! Provides the `Chunker` trait and the fixed-window implementation used for
//! ingestion. Offsets are counted in characters of the normalized text.

use super::config::ChunkingConfig;

/// Trait for document chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split document content into ordered chunks.
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Vec<String>;
}

/// Collapse every whitespace run (newlines included) into a single space
/// and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fixed-size sliding window over normalized text.
///
/// Algorithm:
/// 1. Normalize whitespace
/// 2. Emit `[cursor, min(len, cursor + chunk_size))`
/// 3. Stop once a window reaches the end of the text
/// 4. Otherwise move the cursor to `window_end - overlap`
///
/// The last chunk may be shorter than `chunk_size` and is never padded.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedWindowChunker;

impl FixedWindowChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for FixedWindowChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Vec<String> {
        let normalized = normalize_whitespace(content);
        if normalized.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = normalized.chars().collect();
        let len = chars.len();
        // Guard against a zero stride from an unvalidated config.
        let stride = config.chunk_size.saturating_sub(config.overlap).max(1);
        let window = config.chunk_size.max(1);

        let mut chunks = Vec::with_capacity(expected_chunk_count(len, window, config.overlap));
        let mut cursor = 0;
        loop {
            let end = (cursor + window).min(len);
            chunks.push(chars[cursor..end].iter().collect());

            if end == len {
                break;
            }
            cursor += stride;
        }

        chunks
    }
}

/// Number of chunks produced for normalized length `len`.
///
/// `ceil((len - overlap) / (chunk_size - overlap))` when `len > chunk_size`,
/// one chunk for non-empty shorter text, none for empty text.
pub fn expected_chunk_count(len: usize, chunk_size: usize, overlap: usize) -> usize {
    if len == 0 {
        return 0;
    }
    if len <= chunk_size {
        return 1;
    }
    let stride = chunk_size.saturating_sub(overlap).max(1);
    len.saturating_sub(overlap).div_ceil(stride).max(1)
}

/// Rebuild the normalized text from its chunks by dropping each overlap region.
pub fn reassemble(chunks: &[String], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(chunk);
        } else {
            text.extend(chunk.chars().skip(overlap));
        }
    }
    text
}
