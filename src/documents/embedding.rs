//! Embedding generators for chunk content and queries.
//!
//! The same generator must embed both ingested chunks and queries for a
//! collection's whole lifetime. Each generator exposes a `label()` that the
//! collection persists so a mismatched generator is refused on open.

use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use thiserror::Error;

/// Errors from embedding generation.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("Failed to generate embedding: {0}")]
    Generation(String),

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),
}

/// Produces fixed-dimension vectors for text.
pub trait EmbeddingGenerator: Send + Sync {
    /// Embed a batch of texts, one vector per input in order.
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Length of every produced vector.
    fn dimension(&self) -> usize;

    /// Stable identifier of the embedding scheme.
    fn label(&self) -> &str;
}

/// Name accepted in settings for the offline hashing embedder.
pub const HASHING_MODEL: &str = "hashing";

/// Build the generator named in settings.
pub fn from_settings(
    model: &str,
    cache_dir: Option<PathBuf>,
) -> Result<Box<dyn EmbeddingGenerator>, EmbeddingError> {
    if model.eq_ignore_ascii_case(HASHING_MODEL) {
        return Ok(Box::new(HashingEmbedder::default()));
    }

    let generator = FastEmbedGenerator::new(parse_model(model)?, model, cache_dir)?;
    Ok(Box::new(generator))
}

fn parse_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        "MultilingualE5Small" => Ok(EmbeddingModel::MultilingualE5Small),
        "NomicEmbedTextV15" => Ok(EmbeddingModel::NomicEmbedTextV15),
        other => Err(EmbeddingError::UnknownModel(other.to_string())),
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docqa")
        .join("models")
}

/// ONNX sentence embeddings via fastembed.
pub struct FastEmbedGenerator {
    /// The embedding model (wrapped in Mutex for interior mutability)
    model: Mutex<TextEmbedding>,
    dimension: usize,
    label: String,
}

impl FastEmbedGenerator {
    pub fn new(
        model: EmbeddingModel,
        model_name: &str,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self, EmbeddingError> {
        let cache_dir = cache_dir.unwrap_or_else(default_cache_dir);
        tracing::info!(target: "embedding", "loading model {model_name} (cache: {})", cache_dir.display());

        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(false),
        )
        .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        // Get dimensions by generating a test embedding
        let probe = text_model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::Generation(e.to_string()))?;
        let dimension = probe
            .into_iter()
            .next()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::ModelInit("model produced no probe embedding".into()))?;

        Ok(Self {
            model: Mutex::new(text_model),
            dimension,
            label: format!("fastembed/{model_name}"),
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        self.model
            .lock()
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Generation(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Deterministic bag-of-words embedder that needs no model download.
///
/// Lowercased alphanumeric tokens are hashed (FNV-1a) into buckets and the
/// resulting vector is L2-normalized. Texts sharing vocabulary land close
/// together, which is enough for offline use and tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    label: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            label: format!("{HASHING_MODEL}-{dimension}"),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(&token.to_lowercase()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EmbeddingGenerator for HashingEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn label(&self) -> &str {
        &self.label
    }
}

fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Cosine distance (`1 - cosine similarity`); lower means closer.
///
/// Zero vectors and mismatched lengths are maximally distant from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 1.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a * norm_b)
}
