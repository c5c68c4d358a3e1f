#![deny(missing_docs)]

//! Core library for the docpipe document ingestion service.

/// HTTP routing and REST handlers.
pub mod api;
/// Text chunking strategies.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text extraction from uploaded file formats.
pub mod extract;
/// Upload gateway service.
pub mod gateway;
/// Ingestion run coordination.
pub mod ingest;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Queue transport and the notification consumer.
pub mod queue;
/// Search index integration.
pub mod search;
/// Blob storage integration.
pub mod storage;
