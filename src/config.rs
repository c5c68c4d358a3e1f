use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docpipe service.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the blob store holding uploaded files.
    pub storage_url: String,
    /// Container uploads are written into.
    pub storage_container: String,
    /// Optional API key required by the blob store.
    pub storage_api_key: Option<String>,
    /// Base URL of the notification queue service.
    pub queue_url: String,
    /// Queue that upload notifications are published to.
    pub queue_name: String,
    /// Optional API key required by the queue service.
    pub queue_api_key: Option<String>,
    /// Seconds the consumer sleeps between empty polls.
    pub queue_poll_interval_secs: Option<u64>,
    /// Endpoint of the search index service.
    pub search_endpoint: String,
    /// API key for the search index service.
    pub search_api_key: String,
    /// Name of the index that chunk records are upserted into.
    pub search_index_name: String,
    /// Base URL of the embedding API (OpenAI-compatible).
    pub embedding_url: String,
    /// API key passed as a bearer token to the embedding API.
    pub embedding_api_key: String,
    /// Embedding model identifier passed with each request.
    pub embedding_model: String,
    /// Optional override for the chunk size in characters.
    pub chunk_size: Option<usize>,
    /// Optional delay (seconds) observed between embedding and index upload.
    pub index_delay_secs: Option<u64>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            storage_url: load_env("STORAGE_URL")?,
            storage_container: load_env_optional("STORAGE_CONTAINER")
                .unwrap_or_else(|| "uploaded-files".to_string()),
            storage_api_key: load_env_optional("STORAGE_API_KEY"),
            queue_url: load_env("QUEUE_URL")?,
            queue_name: load_env_optional("QUEUE_NAME")
                .unwrap_or_else(|| "file-upload-events".to_string()),
            queue_api_key: load_env_optional("QUEUE_API_KEY"),
            queue_poll_interval_secs: parse_optional("QUEUE_POLL_INTERVAL_SECS")?,
            search_endpoint: load_env("SEARCH_ENDPOINT")?,
            search_api_key: load_env("SEARCH_API_KEY")?,
            search_index_name: load_env("SEARCH_INDEX_NAME")?,
            embedding_url: load_env_optional("EMBEDDING_API_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            embedding_api_key: load_env("EMBEDDING_API_KEY")?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            chunk_size: parse_optional("CHUNK_SIZE")?,
            index_delay_secs: parse_optional("INDEX_DELAY_SECS")?,
            server_port: parse_optional("SERVER_PORT")?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        storage_url = %config.storage_url,
        container = %config.storage_container,
        queue = %config.queue_name,
        index = %config.search_index_name,
        model = %config.embedding_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
