//! Ingest gateway binary
//!
//! Wires up:
//! - Storage backend selected by `STORAGE_BACKEND`
//! - AMQP task publisher
//! - HTTP inbound adapter (`POST /ingest/video`)

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use video_ingest::adapters::{amqp::AmqpPublisher, build_storage, http};
use video_ingest::application::IngestionService;
use video_ingest::config::IngestConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match IngestConfig::from_env() {
        Ok(config) => config,
        Err(e) => fatal("Invalid configuration", &e),
    };

    // 1. Adapters
    let storage = match build_storage(&config.storage).await {
        Ok(storage) => storage,
        Err(e) => fatal("Failed to set up storage", &e),
    };

    let publisher = match AmqpPublisher::connect(&config.amqp_url, config.publish_timeout).await {
        Ok(publisher) => Arc::new(publisher),
        Err(e) => fatal("Failed to connect to AMQP broker", &e),
    };

    // 2. Application Service
    let service = Arc::new(
        IngestionService::new(storage, publisher.clone())
            .with_queue(config.queue_name.clone())
            .with_storage_timeout(config.storage_timeout),
    );

    // 3. HTTP Layer
    let app = http::router(service, config.max_upload_bytes);

    // 4. Start Server
    let bind = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => fatal("Failed to bind TCP listener", &e),
    };
    tracing::info!(
        address = %bind,
        queue = %config.queue_name,
        max_upload_bytes = config.max_upload_bytes,
        "Listening"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    if let Err(e) = publisher.close().await {
        tracing::warn!(error = %e, "Failed to close AMQP connection");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

fn fatal(context: &str, error: &dyn std::fmt::Display) -> ! {
    tracing::error!(error = %error, "{}", context);
    std::process::exit(1);
}
