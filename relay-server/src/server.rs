//! Main CameraRelay server coordination.
//!
//! CameraRelay owns the room registry, the router, rate limiters and
//! metrics, and hands out session ids to new connections.

use crate::config::Config;
use crate::error::Result;
use crate::limits::RateLimits;
use crate::registry::RoomRegistry;
use crate::router::RelayRouter;
use crate::session::SessionId;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64`, no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total WebSocket connections accepted.
    pub connections_total: AtomicU64,
    /// Total frames forwarded between peers.
    pub messages_relayed: AtomicU64,
    /// Total bytes forwarded between peers.
    pub bytes_relayed: AtomicU64,
    /// Total successful room registrations (either role).
    pub registrations_total: AtomicU64,
    /// Total rate limit rejections (connection + message + global).
    pub rate_limit_hits: AtomicU64,
    /// Total ERROR envelopes sent (protocol and routing rejections).
    pub errors_total: AtomicU64,
}

/// Main relay server.
pub struct CameraRelay {
    config: Config,
    registry: Arc<RoomRegistry>,
    router: RelayRouter,
    /// Rate limiters for connections and messages.
    rate_limits: RateLimits,
    /// Operational metrics (counters, gauges).
    metrics: RelayMetrics,
    next_session: AtomicU64,
    open_sockets: AtomicUsize,
}

impl std::fmt::Debug for CameraRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraRelay")
            .field("config", &self.config)
            .field("rate_limits", &self.rate_limits)
            .field("metrics", &self.metrics)
            .field("rooms", &self.registry.room_count())
            .field("open_sockets", &self.open_sockets())
            .finish_non_exhaustive()
    }
}

impl CameraRelay {
    /// Create a new CameraRelay with the given config.
    pub fn new(config: Config) -> Self {
        let rate_limits = RateLimits::new(&config.limits);
        let registry = Arc::new(RoomRegistry::new());
        Self {
            router: RelayRouter::new(registry.clone()),
            registry,
            config,
            rate_limits,
            metrics: RelayMetrics::default(),
            next_session: AtomicU64::new(1),
            open_sockets: AtomicUsize::new(0),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the room registry.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Get the relay router.
    pub fn router(&self) -> &RelayRouter {
        &self.router
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Reserve a socket slot, or `None` when `max_concurrent_sessions`
    /// sockets are already open.
    ///
    /// The slot is released when the returned guard is dropped.
    pub fn try_open_socket(self: &Arc<Self>) -> Option<SocketGuard> {
        let max = self.config.limits.max_concurrent_sessions;
        self.open_sockets
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                (open < max).then_some(open + 1)
            })
            .ok()?;
        Some(SocketGuard {
            relay: self.clone(),
        })
    }

    /// Allocate a fresh session id.
    pub fn next_session_id(&self) -> SessionId {
        SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed))
    }

    /// Currently open WebSocket connections, bound or not.
    pub fn open_sockets(&self) -> usize {
        self.open_sockets.load(Ordering::Acquire)
    }

    /// Get total live rooms.
    pub fn total_rooms(&self) -> usize {
        self.registry.room_count()
    }

    /// Get total sessions bound to a room slot.
    pub fn bound_sessions(&self) -> usize {
        self.registry.bound_sessions()
    }
}

/// Serve HTTP and WebSocket traffic on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    relay: Arc<CameraRelay>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = crate::http::build_router(relay);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}

/// Holds one of the relay's socket slots.
#[derive(Debug)]
pub struct SocketGuard {
    relay: Arc<CameraRelay>,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        self.relay.open_sockets.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay_with_cap(cap: usize) -> Arc<CameraRelay> {
        let mut config = Config::default();
        config.limits.max_concurrent_sessions = cap;
        Arc::new(CameraRelay::new(config))
    }

    #[test]
    fn session_ids_are_unique() {
        let relay = relay_with_cap(10);
        let a = relay.next_session_id();
        let b = relay.next_session_id();
        assert_ne!(a, b);
    }

    #[test]
    fn socket_cap_is_enforced_and_released() {
        let relay = relay_with_cap(2);

        let first = relay.try_open_socket().unwrap();
        let _second = relay.try_open_socket().unwrap();
        assert!(relay.try_open_socket().is_none());
        assert_eq!(relay.open_sockets(), 2);

        drop(first);
        assert_eq!(relay.open_sockets(), 1);
        assert!(relay.try_open_socket().is_some());
    }

    #[test]
    fn new_relay_is_empty() {
        let relay = relay_with_cap(10);
        assert_eq!(relay.total_rooms(), 0);
        assert_eq!(relay.bound_sessions(), 0);
        assert_eq!(relay.metrics().connections_total.load(Ordering::Relaxed), 0);
        assert!(format!("{relay:?}").contains("CameraRelay"));
    }
}
