//! Per-connection session identity and outbound mailbox.
//!
//! Every WebSocket connection gets a [`SessionHandle`]. The handle is the
//! only way other parts of the relay talk to a connection: frames are queued
//! on a bounded mailbox that the connection's writer task drains in order.

use crate::error::SendError;
use relay_types::{Envelope, Message};
use std::fmt;
use tokio::sync::mpsc;

/// Identifier for one accepted connection, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw id.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Cloneable sending side of a session.
///
/// Sends never block: a full mailbox is reported as [`SendError::Full`]
/// and a connection whose writer has exited as [`SendError::Closed`].
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    mailbox: mpsc::Sender<String>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("closed", &self.mailbox.is_closed())
            .finish()
    }
}

impl SessionHandle {
    /// Create a handle and the receiving end its writer task drains.
    pub fn new(id: SessionId, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (mailbox, rx) = mpsc::channel(capacity.max(1));
        (Self { id, mailbox }, rx)
    }

    /// This session's id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Whether the writer task has gone away.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Queue an already-encoded text frame.
    pub fn send_text(&self, text: String) -> Result<(), SendError> {
        self.mailbox.try_send(text).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Encode and queue an envelope.
    pub fn send_envelope(&self, envelope: &Envelope) -> Result<(), SendError> {
        self.send_text(envelope.to_json()?)
    }

    /// Encode and queue a typed message.
    pub fn send(&self, message: Message) -> Result<(), SendError> {
        self.send_envelope(&Envelope::from(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_display() {
        assert_eq!(SessionId::new(42).to_string(), "session-42");
        assert_eq!(SessionId::new(7).as_u64(), 7);
    }

    #[tokio::test]
    async fn send_queues_encoded_frames_in_order() {
        let (handle, mut rx) = SessionHandle::new(SessionId::new(1), 4);

        handle.send(Message::ClientConnected).unwrap();
        handle
            .send(Message::RoomCreated { pin: "1234".into() })
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"CLIENT_CONNECTED"}"#);
        assert_eq!(
            rx.recv().await.unwrap(),
            r#"{"type":"ROOM_CREATED","pin":"1234"}"#
        );
    }

    #[test]
    fn full_mailbox_is_reported() {
        let (handle, _rx) = SessionHandle::new(SessionId::new(1), 1);
        handle.send_text("a".into()).unwrap();
        assert!(matches!(handle.send_text("b".into()), Err(SendError::Full)));
    }

    #[test]
    fn closed_mailbox_is_reported() {
        let (handle, rx) = SessionHandle::new(SessionId::new(1), 1);
        drop(rx);
        assert!(handle.is_closed());
        assert!(matches!(
            handle.send(Message::ServerDisconnected),
            Err(SendError::Closed)
        ));
    }
}
