//! Configuration types for document chunking.

use serde::{Deserialize, Serialize};

/// Configuration for fixed-window chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between adjacent chunks in characters.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

fn default_chunk_size() -> usize {
    1800
}

fn default_overlap() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Validate configuration values.
    ///
    /// Requires `0 < overlap < chunk_size`.
    pub fn validate(&self) -> Result<(), String> {
        if self.overlap == 0 {
            return Err("overlap must be greater than zero".to_string());
        }

        if self.overlap >= self.chunk_size {
            return Err(format!(
                "overlap ({}) must be less than chunk_size ({})",
                self.overlap, self.chunk_size
            ));
        }

        Ok(())
    }

    /// Distance the window advances between chunks.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}
