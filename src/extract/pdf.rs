//! PDF text extractor.
//!
//! Uses pdf-extract on the in-memory bytes; parsing runs on the blocking pool.

use async_trait::async_trait;

use super::{ExtractError, TextExtractor};

/// Extractor for PDF files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, data: Vec<u8>) -> Result<String, ExtractError> {
        tokio::task::spawn_blocking(move || extract_pdf_text(&data))
            .await
            .map_err(|e| {
                // pdf-extract panics on some malformed inputs
                if e.is_panic() {
                    ExtractError::Pdf("parser panicked on malformed document".to_string())
                } else {
                    ExtractError::Join(e.to_string())
                }
            })?
    }
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_garbage_is_an_error() {
        let result = PdfExtractor.extract(b"definitely not a pdf".to_vec()).await;
        assert!(matches!(result, Err(ExtractError::Pdf(_))));
    }
}
