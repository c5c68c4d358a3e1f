//! HTTP client wrapper for the blob store.
//!
//! Blobs live at `{base}/{container}/{blob}`. The gateway uploads with PUT and
//! receives the blob's URL back; the ingestion pipeline parses that URL into a
//! (container, blob) pair and downloads with GET.

use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Errors raised by blob store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The blob store base URL was not a valid URL.
    #[error("invalid blob store URL: {0}")]
    InvalidUrl(String),
    /// A file URL whose path does not split into container and blob segments.
    #[error("invalid blob path in URL: {0}")]
    InvalidBlobPath(String),
    /// The HTTP request failed outright.
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The blob store answered with a non-success status.
    #[error("storage service returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the store.
        status: StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
}

/// Lightweight HTTP client for blob store operations.
#[derive(Clone)]
pub struct BlobStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BlobStore {
    /// Construct a new client for the given base URL and optional API key.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, StorageError> {
        let client = Client::builder().user_agent("docpipe/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(StorageError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized blob store client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Store `bytes` under `container`/`blob_name`, returning the blob's URL.
    pub async fn upload(
        &self,
        container: &str,
        blob_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let url = self.blob_url(container, blob_name);
        let size = bytes.len();
        let mut request = self.client.put(&url).body(bytes);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            request = request.header("api-key", api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StorageError::UnexpectedStatus { status, body };
            tracing::error!(blob = blob_name, error = %error, "Blob upload failed");
            return Err(error);
        }

        tracing::debug!(container, blob = blob_name, size, "Blob uploaded");
        Ok(url)
    }

    /// Download the bytes stored under `container`/`blob_name`.
    pub async fn download(
        &self,
        container: &str,
        blob_name: &str,
    ) -> Result<Vec<u8>, StorageError> {
        let url = self.blob_url(container, blob_name);
        let mut request = self.client.get(&url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            request = request.header("api-key", api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StorageError::UnexpectedStatus { status, body };
            tracing::error!(blob = blob_name, error = %error, "Blob download failed");
            return Err(error);
        }

        let bytes = response.bytes().await?.to_vec();
        tracing::debug!(container, blob = blob_name, size = bytes.len(), "Blob downloaded");
        Ok(bytes)
    }

    fn blob_url(&self, container: &str, blob_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            container,
            blob_name.trim_start_matches('/')
        )
    }
}

/// Split a stored file's URL path into its (container, blob name) pair.
///
/// The first path segment is the container; everything after it is the blob
/// name (which may itself contain slashes). Paths with fewer than two segments
/// fail with [`StorageError::InvalidBlobPath`].
pub fn parse_blob_url(file_url: &str) -> Result<(String, String), StorageError> {
    let parsed = reqwest::Url::parse(file_url)
        .map_err(|_| StorageError::InvalidBlobPath(file_url.to_string()))?;
    let path = parsed.path().trim_start_matches('/');

    match path.split_once('/') {
        Some((container, blob)) if !container.is_empty() && !blob.is_empty() => {
            Ok((container.to_string(), blob.to_string()))
        }
        _ => Err(StorageError::InvalidBlobPath(file_url.to_string())),
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}
