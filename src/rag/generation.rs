//! Generation backend contract and the Ollama-style HTTP client.
//!
//! The backend is called once per ask, non-streaming, with a fixed timeout.
//! There is no retry: every failure surfaces immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationConfig;

/// Errors from the generation backend.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// A single-shot text completion service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Complete `prompt`, returning the generated text.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError>;

    /// Model identifier reported in stats.
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    options: GenerateOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(
            &config.url,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else if err.is_decode() {
            GenerationError::Malformed(err.to_string())
        } else {
            GenerationError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            options: GenerateOptions { temperature },
            stream: false,
        };

        tracing::debug!(
            target: "generation",
            "POST {} model={} prompt_chars={}",
            self.url,
            self.model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let parsed: GenerateResponse =
            serde_json::from_slice(&bytes).map_err(|e| GenerationError::Malformed(e.to_string()))?;

        Ok(parsed.response.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/generate", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn test_generate_sends_expected_body() {
        let (url, server) =
            one_shot_server("HTTP/1.1 200 OK", r#"{"response": "  **Paris**\n"}"#).await;
        let client = OllamaClient::new(url, "test-model", Duration::from_secs(5));

        let answer = client.generate("What is the capital?", 0.25).await.unwrap();
        assert_eq!(answer, "**Paris**");

        let request = server.await.unwrap();
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["prompt"], "What is the capital?");
        assert_eq!(json["options"]["temperature"], 0.25);
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (url, _server) =
            one_shot_server("HTTP/1.1 500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let client = OllamaClient::new(url, "m", Duration::from_secs(5));

        match client.generate("q", 0.1).await {
            Err(GenerationError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (url, _server) = one_shot_server("HTTP/1.1 200 OK", r#"{"text": "no"}"#).await;
        let client = OllamaClient::new(url, "m", Duration::from_secs(5));

        let err = client.generate("q", 0.1).await.unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OllamaClient::new(
            format!("http://{addr}/api/generate"),
            "m",
            Duration::from_secs(5),
        );
        let err = client.generate("q", 0.1).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unreachable(_)));
    }
}
