//! HTTP endpoints for camera-relay.
//!
//! Serves the WebSocket endpoint alongside the status page, liveness check,
//! stats and Prometheus metrics.

pub mod health;
mod metrics;

use crate::protocol::ws_handler;
use crate::server::CameraRelay;
use axum::{routing::get, Extension, Router};
use std::sync::Arc;

pub use health::RelayStats;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<CameraRelay>) -> Router {
    let ws_path = relay.config().server.ws_path.clone();
    Router::new()
        .route("/", get(health::status_handler))
        .route("/health", get(health::health_handler))
        .route("/stats", get(health::stats_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route(&ws_path, get(ws_handler))
        .layer(Extension(relay))
}
