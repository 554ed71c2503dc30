use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_cache::api::api_server;
use order_cache::cache::OrderCache;
use order_cache::config::Config;
use order_cache::ingestion::{IngestionPipeline, KafkaOrderSource, OrderConsumer};
use order_cache::metrics::{metrics_server, Metrics};
use order_cache::service::{LookupService, StartupRestorer};
use order_cache::store::{OrderStore, PgOrderStore};
use order_cache::utils::{retry_on_transient, RetryConfig, RetryResult};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_cache=debug"))
        )
        .init();

    let config = Config::from_env();
    tracing::info!("🚀 Starting order service");

    // === 1. Connect to PostgreSQL ===
    tracing::info!("Connecting to database...");
    let store = match retry_on_transient(RetryConfig::startup(), |_attempt| {
        PgOrderStore::connect(&config.database_url, config.database_max_connections)
    })
    .await
    {
        RetryResult::Success(store) => Arc::new(store),
        RetryResult::Failed(e) | RetryResult::PermanentFailure(e) => {
            return Err(anyhow::Error::new(e).context("Failed to connect to database"));
        }
    };
    store.ensure_schema().await?;
    let order_store: Arc<dyn OrderStore> = store.clone();

    // === 2. Metrics registry and cache ===
    let metrics = Arc::new(Metrics::new()?);
    let cache = Arc::new(OrderCache::new());

    // === 3. Warm the cache ===
    let restorer = StartupRestorer::new(cache.clone(), order_store.clone(), metrics.clone());
    if let Err(e) = restorer.restore().await {
        tracing::warn!(error = %e, "Could not restore cache from database, starting cold");
    }

    // === 4. Metrics server ===
    let metrics_srv = metrics_server(metrics.clone(), config.metrics_port)?;
    let metrics_handle = metrics_srv.handle();
    actix_web::rt::spawn(metrics_srv);

    // === 5. Kafka consume loop ===
    let shutdown = CancellationToken::new();
    let source = KafkaOrderSource::new(&config.kafka_brokers, &config.kafka_topic, &config.kafka_group_id)?;
    let pipeline = Arc::new(IngestionPipeline::new(order_store.clone(), cache.clone(), metrics.clone()));
    let consumer = OrderConsumer::new(source, pipeline, config.poll_timeout, config.error_backoff);
    let consumer_task = actix_web::rt::spawn(consumer.run(shutdown.clone()));

    // === 6. Read API ===
    let lookup = Arc::new(LookupService::new(cache.clone(), order_store, metrics.clone()));
    let api = api_server(lookup, config.http_port, config.shutdown_timeout)?;
    let api_handle = api.handle();
    let mut api_task = actix_web::rt::spawn(api);

    tracing::info!("Service started successfully! Waiting for messages...");

    // === 7. Wait for a shutdown signal ===
    tokio::select! {
        _ = shutdown_signal() => tracing::info!("Shutting down..."),
        result = &mut api_task => {
            match result {
                Ok(Ok(())) => tracing::warn!("HTTP server stopped unexpectedly"),
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server error"),
                Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
            }
        }
    }

    shutdown.cancel();
    api_handle.stop(true).await;
    metrics_handle.stop(true).await;
    if let Err(e) = consumer_task.await {
        tracing::error!(error = %e, "Consumer task failed");
    }
    store.close().await;

    tracing::info!("Service stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
