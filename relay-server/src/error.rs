//! Error types for camera-relay.
//!
//! [`ProtocolError`] and [`RoutingError`] are recoverable: the connection
//! stays open and the offending session receives an `ERROR` envelope whose
//! `message` is the error's `Display` text. [`RelayError`] is terminal.

use relay_types::{CodecError, DeviceRole, Envelope};

/// Main error type for relay startup and serving failures.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed input from a peer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Frame failed to decode or validate.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Per-session or global message rate exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Rendezvous or forwarding request that cannot be satisfied right now.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoutingError {
    /// `deviceType` is neither SERVER nor CLIENT.
    #[error("Invalid device type. Use SERVER or CLIENT")]
    InvalidDeviceType,

    /// The room's server slot is taken.
    #[error("Room already has a server")]
    ServerSlotTaken,

    /// The room's client slot is taken.
    #[error("Room already has a client")]
    ClientSlotTaken,

    /// A client tried to join a room without a server.
    #[error("No server in room. Server must create room first.")]
    NoServer,

    /// The session registered before and cannot register again.
    #[error("Already in a room")]
    AlreadyInRoom,

    /// Forward attempted by a session that never registered.
    #[error("Not in a room")]
    NotInRoom,

    /// The sender's room vanished.
    #[error("Room not found")]
    RoomNotFound,

    /// The paired slot is empty or its connection just closed.
    #[error("{} not connected", role_label(.0))]
    PeerNotConnected(DeviceRole),

    /// The peer's outbound mailbox is full.
    #[error("{} is not keeping up, message dropped", role_label(.0))]
    PeerBusy(DeviceRole),
}

fn role_label(role: &DeviceRole) -> &'static str {
    match role {
        DeviceRole::Server => "Server",
        DeviceRole::Client => "Client",
    }
}

/// Any recoverable failure answered to the requester with an `ERROR`.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    /// Malformed input.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Unsatisfiable request.
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

impl Rejection {
    /// The `ERROR` envelope sent back to the requester.
    pub fn to_envelope(&self) -> Envelope {
        Envelope::error(self.to_string())
    }
}

impl From<CodecError> for Rejection {
    fn from(err: CodecError) -> Self {
        Self::Protocol(ProtocolError::Codec(err))
    }
}

/// Outbound frame could not be queued on a session.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The session's writer has stopped.
    #[error("session closed")]
    Closed,

    /// The session's mailbox is full.
    #[error("session mailbox full")]
    Full,

    /// The envelope could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[from] CodecError),
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_errors_render_wire_text() {
        assert_eq!(
            RoutingError::PeerNotConnected(DeviceRole::Server).to_string(),
            "Server not connected"
        );
        assert_eq!(
            RoutingError::PeerNotConnected(DeviceRole::Client).to_string(),
            "Client not connected"
        );
        assert_eq!(
            RoutingError::NoServer.to_string(),
            "No server in room. Server must create room first."
        );
    }

    #[test]
    fn rejection_envelope_carries_message() {
        let rejection = Rejection::from(CodecError::InvalidPin);
        let env = rejection.to_envelope();
        assert_eq!(env.msg_type, "ERROR");
        assert_eq!(env.message.as_deref(), Some("PIN must be 4 digits"));
    }

    #[test]
    fn invalid_json_is_reported_generically() {
        let err = relay_types::Envelope::from_json("{oops").unwrap_err();
        let rejection = Rejection::from(err);
        assert_eq!(rejection.to_string(), "Invalid JSON format");
    }
}
