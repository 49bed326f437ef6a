//! Text extraction from uploaded bytes.
//!
//! Every extractor honours the same narrow contract: bytes in, text out.
//! Uploads are classified into [`SourceType`] by content type first and
//! file extension second; anything unrecognized is treated as text.

mod image;
mod pdf;
mod text;

pub use image::OcrImageExtractor;
pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::documents::SourceType;

/// Errors from text extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("image decoding failed: {0}")]
    Image(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("extraction task failed: {0}")]
    Join(String),
}

/// Converts raw upload bytes into a single text string.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, data: Vec<u8>) -> Result<String, ExtractError>;
}

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".tiff", ".bmp"];

/// Classify an upload by content type, then by file extension.
pub fn classify(filename: &str, content_type: Option<&str>) -> SourceType {
    let name = filename.to_lowercase();
    let ctype = content_type.unwrap_or_default().to_lowercase();

    if ctype == "application/pdf" || name.ends_with(".pdf") {
        SourceType::Pdf
    } else if ctype.starts_with("image/") || IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
    {
        SourceType::Image
    } else {
        SourceType::Text
    }
}

/// One extractor per source type.
#[derive(Clone)]
pub struct ExtractorRegistry {
    text: Arc<dyn TextExtractor>,
    pdf: Arc<dyn TextExtractor>,
    image: Arc<dyn TextExtractor>,
}

impl ExtractorRegistry {
    pub fn new(
        text: Arc<dyn TextExtractor>,
        pdf: Arc<dyn TextExtractor>,
        image: Arc<dyn TextExtractor>,
    ) -> Self {
        Self { text, pdf, image }
    }

    /// Registry with the default extractors; OCR runs the given tesseract binary.
    pub fn with_tesseract(command: impl Into<String>) -> Self {
        Self::new(
            Arc::new(PlainTextExtractor),
            Arc::new(PdfExtractor),
            Arc::new(OcrImageExtractor::new(command)),
        )
    }

    pub fn get(&self, source_type: SourceType) -> &Arc<dyn TextExtractor> {
        match source_type {
            SourceType::Text => &self.text,
            SourceType::Pdf => &self.pdf,
            SourceType::Image => &self.image,
        }
    }

    /// Extract text with the extractor matching `source_type`.
    pub async fn extract(
        &self,
        source_type: SourceType,
        data: Vec<u8>,
    ) -> Result<String, ExtractError> {
        tracing::debug!(target: "extract", "extracting {} bytes as {source_type}", data.len());
        self.get(source_type).extract(data).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_tesseract("tesseract")
    }
}
