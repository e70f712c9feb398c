//! Background cleanup task for rate limiter state.
//!
//! Runs periodically to evict limiter keys for addresses and sessions that
//! have gone quiet, and logs a short activity summary.

use crate::config::CleanupConfig;
use crate::server::CameraRelay;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn a background cleanup task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_task(
    relay: Arc<CameraRelay>,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Cleanup task disabled");
            return;
        }

        let interval_secs = config.interval_secs;
        tracing::info!("Cleanup task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;
            sweep(&relay);
        }
    })
}

/// One cleanup pass.
fn sweep(relay: &CameraRelay) {
    let limits = relay.rate_limits();
    let before = limits.connection_keys_count() + limits.message_keys_count();
    limits.shrink();
    let after = limits.connection_keys_count() + limits.message_keys_count();

    if before > after {
        tracing::info!("Cleanup: evicted {} idle rate limiter keys", before - after);
    } else {
        tracing::debug!("Cleanup: no idle rate limiter keys");
    }
    tracing::debug!(
        "Relay status: {} rooms, {} bound sessions, {} open sockets",
        relay.total_rooms(),
        relay.bound_sessions(),
        relay.open_sockets()
    );
}
