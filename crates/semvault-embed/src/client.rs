//! HTTP embedding client speaking the Ollama `/api/embed` contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EmbedError, Result};
use crate::Embedder;

/// Fixed internal batch size: bounds request payload size and the blast
/// radius of a single failed call.
pub const BATCH_SIZE: usize = 16;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Embedding client for an Ollama-compatible host.
///
/// No retry happens at this layer; callers decide whether a failed batch
/// aborts the whole operation.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    host: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    /// Ollama's native field.
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
    /// Fallback field some compatible servers use.
    #[serde(default)]
    data: Option<Vec<Vec<f32>>>,
}

impl OllamaEmbedder {
    #[must_use]
    pub fn new(host: &str, model: impl Into<String>) -> Self {
        let mut host = host.to_owned();
        while host.ends_with('/') {
            host.pop();
        }
        Self {
            client: default_client(),
            host,
            model: model.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Model name sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbedRequest {
            model: &self.model,
            input: batch,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.host))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "embedding API error: {text}");
            return Err(EmbedError::Status(status.as_u16()));
        }

        let parsed: EmbedResponse = serde_json::from_str(&text)?;
        let vectors = parsed
            .embeddings
            .or(parsed.data)
            .unwrap_or_default();

        if vectors.len() != batch.len() {
            return Err(EmbedError::ShapeMismatch {
                expected: batch.len(),
                got: vectors.len(),
            });
        }

        Ok(vectors)
    }
}

impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_batch(batch).await?);
        }
        Ok(out)
    }
}

fn map_transport_error(e: reqwest::Error) -> EmbedError {
    if e.is_timeout() {
        EmbedError::Timeout
    } else {
        EmbedError::Http(e)
    }
}

fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("semvault/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("default HTTP client construction must not fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {i}")).collect()
    }

    #[tokio::test]
    async fn embeds_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[1.0, 0.0], [0.0, 1.0]],
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "test-embed");
        let vectors = embedder.embed(&texts(2)).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn sends_model_and_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-embed",
                "input": ["text 0"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.5]],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "test-embed");
        embedder.embed(&texts(1)).await.unwrap();
    }

    #[tokio::test]
    async fn splits_into_batches_of_sixteen() {
        let server = MockServer::start().await;
        let first_batch: Vec<String> = texts(16);
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(serde_json::json!({ "input": first_batch })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": (0..16).map(|_| vec![0.1]).collect::<Vec<_>>(),
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(serde_json::json!({ "input": ["text 16", "text 17"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.2], [0.3]],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "test-embed");
        let vectors = embedder.embed(&texts(18)).await.unwrap();
        assert_eq!(vectors.len(), 18);
    }

    #[tokio::test]
    async fn shape_mismatch_detected() {
        let server = MockServer::start().await;
        // Three vectors for a four-text batch.
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1], [0.2], [0.3]],
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "test-embed");
        let err = embedder.embed(&texts(4)).await.unwrap_err();
        assert!(matches!(
            err,
            EmbedError::ShapeMismatch {
                expected: 4,
                got: 3
            }
        ));
    }

    #[tokio::test]
    async fn data_field_accepted_as_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [[0.9]],
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "test-embed");
        let vectors = embedder.embed(&texts(1)).await.unwrap();
        assert_eq!(vectors, vec![vec![0.9]]);
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "test-embed");
        let err = embedder.embed(&texts(1)).await.unwrap_err();
        assert!(matches!(err, EmbedError::Status(500)));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "embeddings": [[0.1]] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "test-embed")
            .with_timeout(Duration::from_millis(50));
        let err = embedder.embed(&texts(1)).await.unwrap_err();
        assert!(matches!(err, EmbedError::Timeout));
    }

    #[tokio::test]
    async fn empty_input_needs_no_request() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:1", "test-embed");
        let vectors = embedder.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[test]
    fn trailing_slashes_trimmed() {
        let embedder = OllamaEmbedder::new("http://localhost:11434///", "m");
        assert_eq!(embedder.host, "http://localhost:11434");
    }
}
