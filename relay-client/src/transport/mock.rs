//! Scripted in-memory relay for testing.
//!
//! Tests script what the relay says with [`MockTransport::queue_message`]
//! and inspect what the peer sent with [`MockTransport::sent_messages`].
//! Once the script runs out, `recv()` reports a closed connection.

use super::{Transport, TransportError};
use async_trait::async_trait;
use relay_types::Message;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Scripted transport; clones share the same script and outbox.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<Script>>,
}

#[derive(Debug, Default)]
struct Script {
    connected_to: Option<String>,
    inbound: VecDeque<String>,
    outbound: Vec<String>,
    refuse_connect: Option<String>,
}

impl MockTransport {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Have the relay send `message` next.
    pub fn queue_message(&self, message: &Message) {
        // Every variant encodes; a failure here would be a codec bug.
        if let Ok(text) = message.to_json() {
            self.queue_frame(text);
        }
    }

    /// Have the relay send a raw text frame next (e.g. malformed JSON).
    pub fn queue_frame(&self, text: impl Into<String>) {
        self.script().inbound.push_back(text.into());
    }

    /// Messages the peer sent, in order.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.script()
            .outbound
            .iter()
            .filter_map(|text| Message::from_json(text).ok())
            .collect()
    }

    /// URL of the last successful connect, while connected.
    pub fn connected_address(&self) -> Option<String> {
        self.script().connected_to.clone()
    }

    /// Make the next `connect()` fail with `error`.
    pub fn fail_next_connect(&self, error: &str) {
        self.script().refuse_connect = Some(error.to_string());
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut script = self.script();
        if let Some(error) = script.refuse_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }
        script.connected_to = Some(address.to_string());
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), TransportError> {
        let mut script = self.script();
        if script.connected_to.is_none() {
            return Err(TransportError::NotConnected);
        }
        script.outbound.push(text.to_string());
        Ok(())
    }

    async fn recv(&self) -> Result<String, TransportError> {
        let mut script = self.script();
        if script.connected_to.is_none() {
            return Err(TransportError::NotConnected);
        }
        script
            .inbound
            .pop_front()
            .ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.script().connected_to.is_some()
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.script().connected_to = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "ws://relay.test/camera-relay";

    #[tokio::test]
    async fn script_plays_in_order_then_closes() {
        let transport = MockTransport::new();
        transport.connect(URL).await.unwrap();
        transport.queue_message(&Message::ClientConnected);
        transport.queue_frame("not json");

        assert_eq!(
            transport.recv().await.unwrap(),
            r#"{"type":"CLIENT_CONNECTED"}"#
        );
        assert_eq!(transport.recv().await.unwrap(), "not json");
        assert!(matches!(
            transport.recv().await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn outbound_frames_decode_to_messages() {
        let transport = MockTransport::new();
        transport.connect(URL).await.unwrap();

        transport
            .send(r#"{"type":"COMMAND","command":"RECORD"}"#)
            .await
            .unwrap();

        assert_eq!(
            transport.sent_messages(),
            vec![Message::Command {
                command: "RECORD".into()
            }]
        );
    }

    #[tokio::test]
    async fn io_requires_connection() {
        let transport = MockTransport::new();

        assert!(matches!(
            transport.send("{}").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.recv().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn refused_connect_is_one_shot() {
        let transport = MockTransport::new();
        transport.fail_next_connect("connection refused");

        assert!(matches!(
            transport.connect(URL).await,
            Err(TransportError::ConnectionFailed(_))
        ));
        assert!(!transport.is_connected());

        transport.connect(URL).await.unwrap();
        assert_eq!(transport.connected_address(), Some(URL.to_string()));
    }

    #[tokio::test]
    async fn clones_share_the_script() {
        let relay_side = MockTransport::new();
        let peer_side = relay_side.clone();

        peer_side.connect(URL).await.unwrap();
        peer_side.close().await.unwrap();

        assert!(!relay_side.is_connected());
        assert!(relay_side.connected_address().is_none());
    }
}
