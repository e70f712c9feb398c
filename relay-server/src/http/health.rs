//! Liveness, status page and stats endpoints.

use crate::server::CameraRelay;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Global start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call once at startup).
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

fn uptime_seconds() -> u64 {
    START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Room and connection counts. Never includes PINs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStats {
    /// Number of live rooms.
    pub total_rooms: usize,
    /// Sessions bound to a room slot.
    pub active_connections: usize,
    /// Open WebSocket connections, bound or not.
    pub open_sockets: usize,
    /// Seconds since startup.
    pub uptime_seconds: u64,
}

impl RelayStats {
    /// Snapshot the relay.
    pub fn collect(relay: &CameraRelay) -> Self {
        Self {
            total_rooms: relay.total_rooms(),
            active_connections: relay.bound_sessions(),
            open_sockets: relay.open_sockets(),
            uptime_seconds: uptime_seconds(),
        }
    }
}

/// Liveness check: always the literal `OK`.
pub async fn health_handler() -> &'static str {
    "OK"
}

/// JSON stats handler.
pub async fn stats_handler(Extension(relay): Extension<Arc<CameraRelay>>) -> Json<RelayStats> {
    Json(RelayStats::collect(&relay))
}

/// Plain-text status page.
pub async fn status_handler(Extension(relay): Extension<Arc<CameraRelay>>) -> String {
    let stats = RelayStats::collect(&relay);
    format!(
        "Camera Relay Server\n\
         ===================\n\
         Status: Running\n\
         Active Rooms: {}\n\
         Active Connections: {}\n\
         \n\
         WebSocket Endpoint: {}\n\
         Health Check: /health\n",
        stats.total_rooms,
        stats.active_connections,
        relay.config().server.ws_path,
    )
}
