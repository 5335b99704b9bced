// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use hookrelay_config::model::{GatewayConfig, RelayConfig};
use hookrelay_core::{RelayError, StorageAdapter};
use hookrelay_pipeline::{DestinationRegistry, IngestPipeline, Provisioner};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_session;
use crate::handlers;
use crate::rate_limit::{limit_per_user, RateLimiter};

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    pub pipeline: IngestPipeline,
    pub registry: DestinationRegistry,
    pub provisioner: Provisioner,
    /// Per-user ingestion limiter.
    pub rate_limiter: RateLimiter,
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        config: &RelayConfig,
        prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    ) -> Self {
        Self {
            pipeline: IngestPipeline::new(storage.clone(), config.delivery.max_task_attempts),
            registry: DestinationRegistry::new(storage.clone()),
            provisioner: Provisioner::new(storage.clone()),
            rate_limiter: RateLimiter::per_second(config.gateway.rate_limit_per_second),
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render,
            },
            storage,
        }
    }
}

/// Build the full router.
///
/// - POST /incoming_data (session auth, then per-user rate limit)
/// - GET /v1/accounts/{account_id}/events (session auth)
/// - GET|POST /v1/accounts/{account_id}/destinations (session auth)
/// - GET|PUT|DELETE /v1/destinations/{id} (session auth)
/// - GET /health, GET /metrics (public)
pub fn build_router(state: GatewayState, config: &GatewayConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    // Layers added later run first: auth before the rate limit.
    let ingest_routes = Router::new()
        .route("/incoming_data", post(handlers::incoming_data))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            limit_per_user,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/accounts/{account_id}/events", get(handlers::list_events))
        .route(
            "/v1/accounts/{account_id}/destinations",
            get(handlers::list_destinations).post(handlers::create_destination),
        )
        .route(
            "/v1/destinations/{id}",
            get(handlers::get_destination)
                .put(handlers::update_destination)
                .delete(handlers::delete_destination),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(ingest_routes)
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests))
        .layer(TraceLayer::new_for_http())
}

/// Bind `host:port` and serve `app` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after the signal.
pub async fn start_server<F>(
    host: &str,
    port: u16,
    app: Router,
    shutdown: F,
) -> Result<(), RelayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| RelayError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
