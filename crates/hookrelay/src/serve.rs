// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hookrelay serve` and `hookrelay worker` command implementations.
//!
//! `serve` runs the HTTP gateway and the delivery worker pool in one process
//! against the same SQLite database. `worker` runs the pool alone, for
//! deployments that scale delivery separately from ingestion.

use std::sync::Arc;
use std::time::Duration;

use hookrelay_config::model::RelayConfig;
use hookrelay_core::{RelayError, StorageAdapter};
use hookrelay_gateway::{build_router, start_server, GatewayState, RateLimiter};
use hookrelay_pipeline::{DeliveryWorker, WorkerPool};
use hookrelay_storage::SqliteStorage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::shutdown;

/// How often idle rate-limit windows are discarded.
const RATE_LIMIT_SWEEP: Duration = Duration::from_secs(60);

/// Runs the `hookrelay serve` command.
pub async fn run_serve(config: RelayConfig) -> Result<(), RelayError> {
    info!("starting hookrelay serve");

    let storage = open_storage(&config).await?;
    let prometheus_render = init_prometheus(&config);
    let cancel = shutdown::install_signal_handler();

    let pool = WorkerPool::new(
        DeliveryWorker::new(storage.clone(), &config.delivery)?,
        &config.delivery,
    );
    let pool_handle = tokio::spawn(pool.run(cancel.clone()));

    let state = GatewayState::new(storage.clone(), &config, prometheus_render);
    tokio::spawn(sweep_rate_limits(state.rate_limiter.clone(), cancel.clone()));
    let app = build_router(state, &config.gateway);

    let served = start_server(
        &config.server.host,
        config.server.port,
        app,
        cancel.clone().cancelled_owned(),
    )
    .await;

    // A bind or serve failure must still stop the pool.
    cancel.cancel();
    if let Err(e) = pool_handle.await {
        error!(error = %e, "worker pool task failed");
    }
    storage.close().await?;

    info!("hookrelay serve shutdown complete");
    served
}

/// Runs the `hookrelay worker` command.
pub async fn run_worker(config: RelayConfig) -> Result<(), RelayError> {
    info!("starting hookrelay worker");

    let storage = open_storage(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let pool = WorkerPool::new(
        DeliveryWorker::new(storage.clone(), &config.delivery)?,
        &config.delivery,
    );
    pool.run(cancel).await;
    storage.close().await?;

    info!("hookrelay worker shutdown complete");
    Ok(())
}

pub(crate) async fn open_storage(
    config: &RelayConfig,
) -> Result<Arc<dyn StorageAdapter + Send + Sync>, RelayError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

fn init_prometheus(config: &RelayConfig) -> Option<Arc<dyn Fn() -> String + Send + Sync>> {
    if !config.prometheus.enabled {
        debug!("prometheus metrics disabled by configuration");
        return None;
    }
    match hookrelay_prometheus::PrometheusAdapter::new() {
        Ok(adapter) => {
            info!("prometheus metrics enabled");
            let handle = adapter.handle().clone();
            Some(Arc::new(move || handle.render()) as Arc<dyn Fn() -> String + Send + Sync>)
        }
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    }
}

async fn sweep_rate_limits(limiter: RateLimiter, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(RATE_LIMIT_SWEEP);
    // Skip the first immediate tick.
    interval.tick().await;
    loop {
        tokio::select! {
            _ = interval.tick() => limiter.cleanup(),
            _ = cancel.cancelled() => break,
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence. Output goes to stderr so admin command
/// output on stdout stays machine-readable.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hookrelay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
