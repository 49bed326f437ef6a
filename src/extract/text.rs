//! Plain text extractor.

use async_trait::async_trait;

use super::{ExtractError, TextExtractor};

/// Decodes bytes as UTF-8, dropping invalid sequences.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, data: Vec<u8>) -> Result<String, ExtractError> {
        Ok(decode_utf8_lossless(&data))
    }
}

/// Decode UTF-8, skipping invalid byte sequences instead of replacing them.
fn decode_utf8_lossless(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                // valid_up_to() guarantees this prefix is UTF-8
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let skip = e.error_len().unwrap_or(rest.len());
                bytes = &rest[skip..];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_sequences_dropped() {
        let data = vec![b'a', 0xff, b'b', 0xfe, 0xfd, b'c'];
        let text = PlainTextExtractor.extract(data).await.unwrap();
        assert_eq!(text, "abc");
    }

    #[tokio::test]
    async fn test_multibyte_preserved() {
        let text = PlainTextExtractor
            .extract("naïve café".as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(text, "naïve café");
    }

    #[tokio::test]
    async fn test_truncated_trailing_sequence() {
        let mut data = "ok".as_bytes().to_vec();
        data.push(0xe2); // start of a 3-byte sequence, cut off
        let text = PlainTextExtractor.extract(data).await.unwrap();
        assert_eq!(text, "ok");
    }
}
