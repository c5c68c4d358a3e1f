//! HTTP surface for docpipe.
//!
//! A compact Axum router with two endpoints:
//!
//! - `POST /upload` – Accept a multipart file upload, store it in the blob
//!   store, and publish the notification event that triggers ingestion.
//!   Returns 200 with a confirmation, 400 when no file part is present, and
//!   500 with the error message on storage/queue failure.
//! - `GET /metrics` – Observe ingestion counters.
//!
//! Ingestion itself happens asynchronously on the queue consumer; this surface
//! only feeds the pipeline.

use crate::gateway::{UploadApi, UploadError};
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

/// Shared state handed to every handler.
pub struct AppState<U> {
    gateway: Arc<U>,
    metrics: Arc<IngestMetrics>,
}

/// Build the HTTP router exposing the upload gateway.
pub fn create_router<U>(gateway: Arc<U>, metrics: Arc<IngestMetrics>) -> Router
where
    U: UploadApi + 'static,
{
    Router::new()
        .route("/upload", post(upload_file::<U>))
        .route("/metrics", get(get_metrics::<U>))
        .with_state(Arc::new(AppState { gateway, metrics }))
}

/// Accept a multipart upload, store it, and publish its notification event.
///
/// The first part named `file` is used; its caller-supplied filename becomes
/// the blob name and the `fileName` recorded with every indexed chunk.
async fn upload_file<U>(
    State(state): State<Arc<AppState<U>>>,
    mut multipart: Multipart,
) -> Result<String, AppError>
where
    U: UploadApi,
{
    tracing::info!("File upload request received");

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::BadRequest(error.to_string()))?
    {
        if field.name() == Some("file") {
            let file_name = field
                .file_name()
                .filter(|name| !name.is_empty())
                .unwrap_or("upload.bin")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|error| AppError::BadRequest(error.to_string()))?
                .to_vec();
            upload = Some((file_name, bytes));
            break;
        }
    }

    let Some((file_name, bytes)) = upload else {
        return Err(AppError::NoFile);
    };

    let receipt = state.gateway.store_and_notify(&file_name, bytes).await?;
    tracing::info!(file = %file_name, file_id = %receipt.file_id, "Upload request completed");
    Ok(format!("File '{file_name}' uploaded and message sent."))
}

/// Return the current ingestion counters.
async fn get_metrics<U>(State(state): State<Arc<AppState<U>>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

enum AppError {
    NoFile,
    BadRequest(String),
    Upload(UploadError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NoFile => {
                (StatusCode::BAD_REQUEST, "No file found in request.".to_string()).into_response()
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Upload(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Upload failed: {error}"),
            )
                .into_response(),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(inner: UploadError) -> Self {
        Self::Upload(inner)
    }
}
