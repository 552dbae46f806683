//! Medscribe Server
//!
//! HTTP and event front end for report extraction and follow-up answering.
//! Request handling is stateless: one generation provider is built at
//! startup and shared by every request.

#![warn(missing_docs)]

pub mod config;
pub mod events;
pub mod handlers;

use config::ServerConfig;
use events::MemoryAnalysisSink;
use handlers::{create_router, AppState};
use medscribe_llm::{GeminiProvider, LlmError};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Generation provider could not be constructed
    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build the generation provider described by the configuration
///
/// Fails fast when the API key is not available.
pub async fn build_provider(config: &ServerConfig) -> Result<GeminiProvider, ServerError> {
    let api_key = config.provider.api_key()?;
    let provider = config.provider.clone();

    // The blocking HTTP client must be built off the async runtime
    tokio::task::spawn_blocking(move || {
        GeminiProvider::with_timeout(
            provider.endpoint,
            provider.model,
            api_key,
            Duration::from_secs(provider.request_timeout_secs),
        )
        .map(|p| p.with_max_attempts(provider.max_attempts))
    })
    .await
    .map_err(|e| ServerError::Server(format!("Task join error: {}", e)))?
    .map_err(ServerError::from)
}

/// Start the HTTP server
///
/// Builds the provider, initializes shared state and serves until the
/// process is stopped.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting Medscribe server");
    info!("Bind address: {}", config.bind_addr());
    info!("Model: {}", config.provider.model);
    info!(
        "Generation timeout: {}",
        config
            .extraction
            .generation_timeout_secs
            .map_or("none".to_string(), |s| format!("{} s", s))
    );

    let provider = Arc::new(build_provider(&config).await?);
    let sink = Arc::new(MemoryAnalysisSink::new());
    let state = AppState::new(provider, config.extraction.clone(), sink);

    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
