use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

use quos_index::IndexClient;
use quos_server::app;
use quos_server::config::ServerConfig;
use quos_server::state::AppState;
use quos_storage::Store;
use quos_workers::{IndexerWorker, NotifierWorker, PollingDriver, RuleWorker};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env();

    let directive = if config.debug { "quos=debug" } else { "quos=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    tracing::info!(
        port = config.port,
        debug = config.debug,
        poll_interval_secs = config.worker_poll_interval_secs,
        "quos-server starting"
    );

    let store = Store::connect(&config.database_url).await?;
    tracing::info!("connected to database");

    let index = Arc::new(IndexClient::new(
        &config.elasticsearch_url,
        &config.elasticsearch_index,
    ));
    match index.ping().await {
        Ok(()) => {
            tracing::info!(index = index.index_name(), "connected to analytics index");
            if let Err(e) = index.ensure_index().await {
                tracing::warn!(error = %e, "failed to create analytics index");
            }
        }
        Err(e) => {
            // Not fatal: the indexer keeps polling without acking and
            // drains the backlog once the index comes back.
            tracing::warn!(error = %e, "analytics index not available, indexer will retry");
        }
    }

    // All workers watch one shutdown flag; each finishes its in-flight
    // batch before exiting.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker_handles = Vec::new();

    let rule_driver = PollingDriver::new(
        store.clone(),
        RuleWorker::new(store.clone()),
        config.worker_poll_interval_secs,
        config.worker_batch_size,
    );
    worker_handles.push(tokio::spawn(rule_driver.run(shutdown_rx.clone())));

    let indexer_driver = PollingDriver::new(
        store.clone(),
        IndexerWorker::new(store.clone(), index),
        config.worker_poll_interval_secs,
        config.worker_batch_size,
    );
    worker_handles.push(tokio::spawn(indexer_driver.run(shutdown_rx.clone())));

    let notifier_driver = PollingDriver::new(
        store.clone(),
        NotifierWorker::new(store.clone()),
        config.worker_poll_interval_secs,
        config.worker_batch_size,
    );
    worker_handles.push(tokio::spawn(notifier_driver.run(shutdown_rx.clone())));

    // Hourly retention sweep over fully-acked outbox rows.
    let cleanup_store = store.clone();
    let retention_hours = config.outbox_retention_hours;
    let mut cleanup_shutdown = shutdown_rx.clone();
    worker_handles.push(tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(3600));
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let horizon = chrono::Utc::now() - chrono::Duration::hours(retention_hours);
                    match cleanup_store.cleanup_outbox(horizon).await {
                        Ok(removed) if removed > 0 => {
                            tracing::info!(removed, "cleaned up acked outbox events");
                        }
                        Err(e) => tracing::error!(error = %e, "outbox cleanup failed"),
                        _ => {}
                    }
                }
                _ = cleanup_shutdown.changed() => return,
            }
        }
    }));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let state = AppState::new(store, config);
    let router = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);
    for handle in worker_handles {
        if tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .is_err()
        {
            tracing::warn!("worker did not stop within the shutdown budget");
        }
    }
    tracing::info!("server stopped");

    Ok(())
}
