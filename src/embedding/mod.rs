use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// The HTTP request to the embedding service failed outright.
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The embedding service answered with a non-success status.
    #[error("embedding service returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// The embedding service answered successfully but carried no vectors.
    #[error("embedding service returned no vectors")]
    EmptyResponse,
}

/// Interface implemented by embedding backends.
///
/// One call maps one chunk of text to one vector. The pipeline invokes this
/// sequentially, chunk by chunk; a failed call drops that chunk only.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for the supplied text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}

/// OpenAI-compatible embedding client (`POST {base}/embeddings`).
pub struct OpenAiEmbeddingClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Construct a client for the given endpoint, API key, and model.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, EmbeddingClientError> {
        let client = Client::builder().user_agent("docpipe/0.1").build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": text,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let payload: EmbeddingsResponse = response.json().await?;
        // Vector length is whatever the model produced; it is not validated here.
        payload
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or(EmbeddingClientError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn embed_emits_expected_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .header("authorization", "Bearer sk-test")
                    .json_body(json!({
                        "model": "text-embedding-3-small",
                        "input": "a chunk of text",
                    }));
                then.status(200).json_body(json!({
                    "data": [{ "embedding": [0.25, -0.5, 1.0] }]
                }));
            })
            .await;

        let client =
            OpenAiEmbeddingClient::new(&server.base_url(), "sk-test", "text-embedding-3-small")
                .expect("client");
        let vector = client.embed("a chunk of text").await.expect("embedding");

        mock.assert();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn embed_surfaces_service_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(429).body("rate limited");
            })
            .await;

        let client = OpenAiEmbeddingClient::new(&server.base_url(), "sk-test", "test-model")
            .expect("client");
        let error = client.embed("chunk").await.unwrap_err();

        match error {
            EmbeddingClientError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn embed_rejects_empty_data() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let client = OpenAiEmbeddingClient::new(&server.base_url(), "sk-test", "test-model")
            .expect("client");
        let error = client.embed("chunk").await.unwrap_err();
        assert!(matches!(error, EmbeddingClientError::EmptyResponse));
    }
}
