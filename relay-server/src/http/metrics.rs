//! Prometheus metrics endpoint.

use crate::server::CameraRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<CameraRelay>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(&relay),
    )
}

fn render(relay: &CameraRelay) -> String {
    let m = relay.metrics();

    // Gauges
    let sockets = relay.open_sockets();
    let bound = relay.bound_sessions();
    let rooms = relay.total_rooms();

    // Counters
    let conns_total = m.connections_total.load(Ordering::Relaxed);
    let registrations = m.registrations_total.load(Ordering::Relaxed);
    let rooms_created = relay.registry().rooms_created_total();
    let relayed = m.messages_relayed.load(Ordering::Relaxed);
    let bytes = m.bytes_relayed.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    format!(
        r#"# HELP camera_relay_connections_active Number of open WebSocket connections
# TYPE camera_relay_connections_active gauge
camera_relay_connections_active {sockets}

# HELP camera_relay_sessions_bound Number of connections bound to a room slot
# TYPE camera_relay_sessions_bound gauge
camera_relay_sessions_bound {bound}

# HELP camera_relay_rooms_active Number of live rooms
# TYPE camera_relay_rooms_active gauge
camera_relay_rooms_active {rooms}

# HELP camera_relay_info Server information
# TYPE camera_relay_info gauge
camera_relay_info{{version="{version}"}} 1

# HELP camera_relay_connections_total Total WebSocket connections accepted
# TYPE camera_relay_connections_total counter
camera_relay_connections_total {conns_total}

# HELP camera_relay_registrations_total Total successful room registrations
# TYPE camera_relay_registrations_total counter
camera_relay_registrations_total {registrations}

# HELP camera_relay_rooms_created_total Total rooms created
# TYPE camera_relay_rooms_created_total counter
camera_relay_rooms_created_total {rooms_created}

# HELP camera_relay_messages_relayed_total Total frames forwarded between peers
# TYPE camera_relay_messages_relayed_total counter
camera_relay_messages_relayed_total {relayed}

# HELP camera_relay_bytes_relayed_total Total bytes forwarded between peers
# TYPE camera_relay_bytes_relayed_total counter
camera_relay_bytes_relayed_total {bytes}

# HELP camera_relay_rate_limit_hits_total Total rate limit rejections
# TYPE camera_relay_rate_limit_hits_total counter
camera_relay_rate_limit_hits_total {rate_limits}

# HELP camera_relay_errors_total Total ERROR replies sent
# TYPE camera_relay_errors_total counter
camera_relay_errors_total {errors}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
