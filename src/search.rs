//! HTTP client wrapper for the vector search index.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// API version sent with every index request.
const API_VERSION: &str = "2023-11-01";

/// Errors raised by search index operations.
#[derive(Debug, Error)]
pub enum SearchIndexError {
    /// The configured endpoint was not a valid URL.
    #[error("invalid search endpoint: {0}")]
    InvalidUrl(String),
    /// The HTTP request failed outright.
    #[error("search index request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The index service answered with a non-success status.
    #[error("search index returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
}

/// A single retrievable record stored in the search index.
///
/// Identity is the generated `id`, not the source document: re-ingesting the
/// same file produces new records rather than replacing old ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    /// Unique record identifier, generated per chunk at ingestion time.
    pub id: String,
    /// Chunk text.
    pub content: String,
    /// Embedding vector for the chunk text.
    pub content_vector: Vec<f32>,
    /// Name of the source file this chunk was extracted from.
    pub file_name: String,
}

/// Lightweight HTTP client for batch upserts into the search index.
pub struct SearchIndexService {
    client: Client,
    endpoint: String,
    api_key: String,
    index_name: String,
}

impl SearchIndexService {
    /// Construct a new client for the given endpoint, API key, and index.
    pub fn new(endpoint: &str, api_key: &str, index_name: &str) -> Result<Self, SearchIndexError> {
        let client = Client::builder().user_agent("docpipe/0.1").build()?;
        let endpoint = normalize_endpoint(endpoint).map_err(SearchIndexError::InvalidUrl)?;
        tracing::debug!(endpoint = %endpoint, index = index_name, "Initialized search index client");

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
            index_name: index_name.to_string(),
        })
    }

    /// Upsert a batch of records in one call.
    ///
    /// An empty batch is a no-op; callers short-circuit before reaching this,
    /// but the guard keeps the wire contract honest either way.
    pub async fn upsert_documents(
        &self,
        documents: &[IndexDocument],
    ) -> Result<(), SearchIndexError> {
        if documents.is_empty() {
            return Ok(());
        }

        let actions: Vec<serde_json::Value> = documents
            .iter()
            .map(|document| {
                json!({
                    "@search.action": "mergeOrUpload",
                    "id": document.id,
                    "content": document.content,
                    "contentVector": document.content_vector,
                    "fileName": document.file_name,
                })
            })
            .collect();

        let url = format!(
            "{}/indexes/{}/docs/index",
            self.endpoint.trim_end_matches('/'),
            self.index_name
        );
        let response = self
            .client
            .post(url)
            .query(&[("api-version", API_VERSION)])
            .header("api-key", &self.api_key)
            .json(&json!({ "value": actions }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = SearchIndexError::UnexpectedStatus { status, body };
            tracing::error!(index = %self.index_name, error = %error, "Index upload failed");
            return Err(error);
        }

        tracing::debug!(
            index = %self.index_name,
            documents = documents.len(),
            "Documents upserted"
        );
        Ok(())
    }
}

fn normalize_endpoint(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn upsert_emits_one_batch_call() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/indexes/documents/docs/index")
                    .query_param("api-version", API_VERSION)
                    .header("api-key", "search-key")
                    .json_body(json!({
                        "value": [
                            {
                                "@search.action": "mergeOrUpload",
                                "id": "record-1",
                                "content": "first chunk",
                                "contentVector": [0.1, 0.2],
                                "fileName": "report.pdf"
                            },
                            {
                                "@search.action": "mergeOrUpload",
                                "id": "record-2",
                                "content": "second chunk",
                                "contentVector": [0.3, 0.4],
                                "fileName": "report.pdf"
                            }
                        ]
                    }));
                then.status(200).json_body(json!({ "value": [] }));
            })
            .await;

        let service = SearchIndexService::new(&server.base_url(), "search-key", "documents")
            .expect("client");
        let documents = vec![
            IndexDocument {
                id: "record-1".into(),
                content: "first chunk".into(),
                content_vector: vec![0.1, 0.2],
                file_name: "report.pdf".into(),
            },
            IndexDocument {
                id: "record-2".into(),
                content: "second chunk".into(),
                content_vector: vec![0.3, 0.4],
                file_name: "report.pdf".into(),
            },
        ];

        service
            .upsert_documents(&documents)
            .await
            .expect("upsert succeeds");
        mock.assert();
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes/documents/docs/index");
                then.status(200);
            })
            .await;

        let service = SearchIndexService::new(&server.base_url(), "search-key", "documents")
            .expect("client");
        service.upsert_documents(&[]).await.expect("no-op");

        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn upsert_surfaces_service_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes/documents/docs/index");
                then.status(503).body("index unavailable");
            })
            .await;

        let service = SearchIndexService::new(&server.base_url(), "search-key", "documents")
            .expect("client");
        let documents = vec![IndexDocument {
            id: "record-1".into(),
            content: "chunk".into(),
            content_vector: vec![0.5],
            file_name: "notes.txt".into(),
        }];

        let error = service.upsert_documents(&documents).await.unwrap_err();
        match error {
            SearchIndexError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "index unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
