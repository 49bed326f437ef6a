//! Image OCR extractor.
//!
//! The upload is decoded with the `image` crate and normalized to an RGB
//! PNG, which is piped to the `tesseract` command line tool.

use std::io::Cursor;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{ExtractError, TextExtractor};

/// Extractor for raster images via OCR.
#[derive(Debug, Clone)]
pub struct OcrImageExtractor {
    command: String,
}

impl OcrImageExtractor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    async fn run_ocr(&self, png: Vec<u8>) -> Result<String, ExtractError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractError::Ocr(format!("failed to start '{}': {e}", self.command)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png).await?;
            // Dropping stdin closes the pipe so tesseract sees EOF
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for OcrImageExtractor {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl TextExtractor for OcrImageExtractor {
    async fn extract(&self, data: Vec<u8>) -> Result<String, ExtractError> {
        debug!("Decoding image of {} bytes for OCR", data.len());

        let png = tokio::task::spawn_blocking(move || normalize_to_png(&data))
            .await
            .map_err(|e| ExtractError::Join(e.to_string()))??;

        self.run_ocr(png).await
    }
}

/// Decode any supported format and re-encode it as an RGB PNG.
fn normalize_to_png(bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| ExtractError::Image(e.to_string()))?;
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| ExtractError::Image(e.to_string()))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 128]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_normalize_produces_rgb_png() {
        let png = normalize_to_png(&tiny_png()).unwrap();
        let reloaded = image::load_from_memory(&png).unwrap();
        assert_eq!(reloaded.color(), image::ColorType::Rgb8);
        assert_eq!((reloaded.width(), reloaded.height()), (2, 2));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_image_errors() {
        let extractor = OcrImageExtractor::default();
        let result = extractor.extract(b"not an image".to_vec()).await;
        assert!(matches!(result, Err(ExtractError::Image(_))));
    }

    #[tokio::test]
    async fn test_missing_ocr_binary_is_ocr_error() {
        let extractor = OcrImageExtractor::new("docqa-no-such-ocr-binary");
        let result = extractor.extract(tiny_png()).await;
        assert!(matches!(result, Err(ExtractError::Ocr(_))));
    }
}
