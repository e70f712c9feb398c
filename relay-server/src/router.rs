//! Relay router: moves payload frames between the two peers of a room.
//!
//! Forwarding is fire-and-forget. The frame is queued on the peer's
//! mailbox exactly as it arrived; nothing is buffered for an absent peer
//! and nothing is retried.

use crate::error::{RoutingError, SendError};
use crate::registry::RoomRegistry;
use crate::session::SessionId;
use std::sync::Arc;

/// Forwards COMMAND, RESPONSE and IMAGE frames to the paired peer.
#[derive(Debug, Clone)]
pub struct RelayRouter {
    registry: Arc<RoomRegistry>,
}

impl RelayRouter {
    /// Create a router over `registry`.
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Queue `text` for the peer of `from`.
    ///
    /// Returns the number of bytes forwarded.
    pub fn forward(&self, from: SessionId, text: String) -> Result<usize, RoutingError> {
        let binding = self.registry.binding(from).ok_or(RoutingError::NotInRoom)?;
        let target = binding.role.peer();
        let len = text.len();

        self.registry
            .with_occupant(&binding.pin, target, |peer| {
                let peer = peer.ok_or(RoutingError::PeerNotConnected(target))?;
                peer.send_text(text).map_err(|e| match e {
                    SendError::Full => RoutingError::PeerBusy(target),
                    SendError::Closed | SendError::Encode(_) => {
                        RoutingError::PeerNotConnected(target)
                    }
                })?;
                tracing::debug!("{} -> {} ({} bytes)", from, peer.id(), len);
                Ok(len)
            })
            .ok_or(RoutingError::RoomNotFound)?
    }
}
