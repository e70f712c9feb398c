//! WebSocket upgrade handler for the camera relay endpoint.
//!
//! Admission happens before the upgrade: a remote over its connection rate
//! gets HTTP 429 and a relay at its socket cap gets HTTP 503. Accepted
//! sockets are handed to [`crate::connection::run`].

use crate::connection;
use crate::server::CameraRelay;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ConnectInfo;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Default WebSocket endpoint path.
pub const DEFAULT_WS_PATH: &str = "/camera-relay";

/// Upgrade handler mounted at the configured WebSocket path.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Extension(relay): Extension<Arc<CameraRelay>>,
) -> Response {
    // Rate limit check: prevent connection flooding from a single address
    if let Err(e) = relay.rate_limits().check_connection(remote.ip()) {
        tracing::warn!("Connection rate limited for {}: {}", remote, e);
        relay
            .metrics()
            .rate_limit_hits
            .fetch_add(1, Ordering::Relaxed);
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response();
    }

    let Some(guard) = relay.try_open_socket() else {
        tracing::warn!(
            "Connection limit reached ({}), rejecting {}",
            relay.config().limits.max_concurrent_sessions,
            remote
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    relay
        .metrics()
        .connections_total
        .fetch_add(1, Ordering::Relaxed);

    let max_size = relay.config().websocket.max_message_size;
    ws.max_message_size(max_size)
        .max_frame_size(max_size)
        .on_upgrade(move |socket| connection::run(socket, relay, remote, guard))
}
