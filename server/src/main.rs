#![forbid(unsafe_code)]
//! knnrec HTTP server.
//!
//! Exposes:
//! - `GET /live`: process liveness
//! - `GET /ready`: readiness with loaded resource sizes
//! - `GET /customers/:customer_id/recommendations`: recommendations for one customer
//! - `POST /recommendations`: same, with a JSON body
//! - `POST /recommendations/batch`: recommendations for many customers
//! - `GET /metrics`: Prometheus text exposition

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Request};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use knnrec_core::ResourceLoader;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handler_utils;
mod handlers;
mod http_metrics;
mod models;
mod prometheus_exporter;
mod state;

use crate::config::AppConfig;
use crate::errors::handle_middleware_error;
use crate::handlers::{live, metrics, ready, recommend, recommend_batch, recommend_for_customer};
use crate::http_metrics::track_http_metrics;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let bind = config.bind;

    let started = Instant::now();
    let loader = ResourceLoader::new(config.loader_paths());
    let resources = loader
        .load()
        .context("failed to load recommendation resources")?;
    let index_source = config
        .index_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built from matrix>".to_string());
    tracing::info!(
        matrix_path = %config.matrix_path.display(),
        index_source = %index_source,
        customers = resources.matrix.len(),
        products = resources.matrix.dimension(),
        indexed_customers = resources.index.len(),
        metric = ?resources.index.metric(),
        load_ms = started.elapsed().as_millis() as u64,
        "recommendation resources loaded"
    );

    let state =
        AppState::new(config.clone(), resources).context("failed to register metrics")?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind server socket on {bind}"))?;

    tracing::info!(
        %bind,
        default_top_n = config.default_top_n,
        max_top_n = config.max_top_n,
        max_batch = config.max_batch,
        timeout_ms = config.request_timeout_ms,
        max_body_bytes = config.max_body_bytes,
        max_concurrency = config.max_concurrency,
        "knnrec server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited unexpectedly")?;

    Ok(())
}

fn build_app(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");
    let config = state.config.clone();
    let timeout = Duration::from_millis(config.request_timeout_ms);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .layer(TimeoutLayer::new(timeout))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrency))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<_>| {
                    let request_id = request
                        .headers()
                        .get(&request_id_header)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id
                    )
                })
                .on_response(DefaultOnResponse::new().latency_unit(LatencyUnit::Millis)),
        );

    Router::new()
        .route("/live", get(live))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .route(
            "/customers/:customer_id/recommendations",
            get(recommend_for_customer),
        )
        .route("/recommendations", post(recommend))
        .route("/recommendations/batch", post(recommend_batch))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(middleware)
        .layer(from_fn_with_state(state.clone(), track_http_metrics))
        .with_state(state)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(error) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("failed to initialize tracing subscriber: {error}");
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(error) => tracing::error!(%error, "failed to install Ctrl-C handler"),
    }
}
