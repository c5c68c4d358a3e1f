use docpipe::{
    api,
    chunking::{DEFAULT_CHUNK_SIZE, FixedSizeSplitter},
    config,
    embedding::OpenAiEmbeddingClient,
    gateway::UploadService,
    ingest::{IndexThrottle, IngestionService},
    logging,
    metrics::IngestMetrics,
    queue::{QueueClient, QueueConsumer},
    search::SearchIndexService,
    storage::BlobStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let storage = Arc::new(
        BlobStore::new(&config.storage_url, config.storage_api_key.clone())
            .expect("Failed to build blob store client"),
    );
    let queue = QueueClient::new(
        &config.queue_url,
        &config.queue_name,
        config.queue_api_key.clone(),
    )
    .expect("Failed to build queue client");
    let embedder = Box::new(
        OpenAiEmbeddingClient::new(
            &config.embedding_url,
            &config.embedding_api_key,
            &config.embedding_model,
        )
        .expect("Failed to build embedding client"),
    );
    let search = SearchIndexService::new(
        &config.search_endpoint,
        &config.search_api_key,
        &config.search_index_name,
    )
    .expect("Failed to build search index client");
    let splitter = Box::new(
        FixedSizeSplitter::new(config.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))
            .expect("CHUNK_SIZE must be greater than zero"),
    );
    let throttle = IndexThrottle::new(Duration::from_secs(config.index_delay_secs.unwrap_or(0)));
    let metrics = Arc::new(IngestMetrics::new());

    let ingestion = Arc::new(IngestionService::new(
        storage.clone(),
        embedder,
        search,
        splitter,
        throttle,
        metrics.clone(),
    ));
    let consumer = QueueConsumer::new(
        queue.clone(),
        ingestion,
        Duration::from_secs(config.queue_poll_interval_secs.unwrap_or(5)),
    );
    tokio::spawn(consumer.run());

    let upload_gateway = Arc::new(UploadService::new(
        storage,
        queue,
        config.storage_container.clone(),
    ));
    let app = api::create_router(upload_gateway, metrics);

    let (listener, port) = bind_listener().await.expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.unwrap();
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8200..=8299;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 8200-8299",
    ))
}
