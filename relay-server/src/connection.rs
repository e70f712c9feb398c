//! Per-connection handler.
//!
//! Each upgraded WebSocket runs [`run`] in its own task. The socket is
//! split: a writer task owns the sink, drains the session mailbox and sends
//! keepalive pings, while the reader loop below decodes text frames and
//! dispatches them to the registry or the router. Whatever ends the
//! connection (close frame, transport error, idle timeout, writer failure),
//! the session is removed from the registry before the task exits.

use crate::error::{ProtocolError, Rejection};
use crate::server::{CameraRelay, SocketGuard};
use crate::session::{SessionHandle, SessionId};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use relay_types::{CodecError, Envelope, Message, MessageType};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};

/// How long teardown waits for the writer to flush before aborting it.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Why the reader loop stopped.
#[derive(Debug, PartialEq, Eq)]
enum Exit {
    Closed,
    IdleTimeout,
    TransportError,
    WriterStopped,
}

/// Drive one WebSocket connection until it ends.
pub async fn run(
    socket: WebSocket,
    relay: Arc<CameraRelay>,
    remote: SocketAddr,
    _guard: SocketGuard,
) {
    let id = relay.next_session_id();
    let ws_config = relay.config().websocket.clone();
    let (handle, mailbox) = SessionHandle::new(id, ws_config.mailbox_capacity);
    tracing::info!("New connection {} from {}", id, remote);

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(
        sink,
        mailbox,
        Duration::from_secs(ws_config.ping_interval_secs),
    ));
    let idle = Duration::from_secs(ws_config.idle_timeout_secs);
    let connection = Connection {
        relay: relay.clone(),
        handle,
    };

    let exit = loop {
        tokio::select! {
            frame = timeout(idle, stream.next()) => match frame {
                Err(_) => break Exit::IdleTimeout,
                Ok(None) => break Exit::Closed,
                Ok(Some(Err(e))) => {
                    tracing::debug!("{}: transport error: {}", id, e);
                    break Exit::TransportError;
                }
                Ok(Some(Ok(WsMessage::Text(text)))) => connection.handle_text(text),
                Ok(Some(Ok(WsMessage::Binary(bytes)))) => {
                    tracing::debug!("{}: ignoring {} byte binary frame", id, bytes.len());
                }
                Ok(Some(Ok(WsMessage::Close(_)))) => break Exit::Closed,
                Ok(Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_)))) => {}
            },
            _ = &mut writer => break Exit::WriterStopped,
        }
    };

    relay.registry().remove_session(id);
    drop(connection);

    if exit != Exit::WriterStopped && timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }

    tracing::info!("Connection {} from {} closed ({:?})", id, remote, exit);
}

/// Single writer for the socket: mailbox frames in order, plus pings.
async fn write_loop(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut mailbox: mpsc::Receiver<String>,
    ping_every: Duration,
) {
    let mut ping = interval_at(Instant::now() + ping_every, ping_every);
    loop {
        let outbound = tokio::select! {
            frame = mailbox.recv() => match frame {
                Some(text) => WsMessage::Text(text),
                None => break,
            },
            _ = ping.tick() => WsMessage::Ping(Vec::new()),
        };
        if sink.send(outbound).await.is_err() {
            return;
        }
    }
    let _ = sink.close().await;
}

/// Reader-side state for one session.
struct Connection {
    relay: Arc<CameraRelay>,
    handle: SessionHandle,
}

impl Connection {
    fn id(&self) -> SessionId {
        self.handle.id()
    }

    fn handle_text(&self, text: String) {
        if let Err(e) = self.relay.rate_limits().check_message(self.id()) {
            tracing::warn!("{}: {}", self.id(), e);
            self.relay
                .metrics()
                .rate_limit_hits
                .fetch_add(1, Ordering::Relaxed);
            self.reject(ProtocolError::RateLimited.into());
            return;
        }

        if let Err(rejection) = self.dispatch(text) {
            self.reject(rejection);
        }
    }

    fn dispatch(&self, text: String) -> Result<(), Rejection> {
        let envelope = Envelope::from_json(&text)?;
        let kind = envelope.message_type()?;
        if !accepts(kind) {
            return Err(CodecError::UnknownMessageType(envelope.msg_type).into());
        }

        let metrics = self.relay.metrics();
        match Message::try_from(&envelope)? {
            Message::CreateRoom(request) | Message::JoinRoom(request) => {
                self.relay
                    .registry()
                    .create_or_join(&self.handle, &request)?;
                metrics.registrations_total.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                let bytes = self.relay.router().forward(self.id(), text)?;
                metrics.messages_relayed.fetch_add(1, Ordering::Relaxed);
                metrics
                    .bytes_relayed
                    .fetch_add(bytes as u64, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    fn reject(&self, rejection: Rejection) {
        tracing::debug!("{}: rejected: {}", self.id(), rejection);
        self.relay
            .metrics()
            .errors_total
            .fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.handle.send_envelope(&rejection.to_envelope()) {
            tracing::debug!("{}: could not queue ERROR: {}", self.id(), e);
        }
    }
}

/// Types a peer may send to the relay.
fn accepts(kind: MessageType) -> bool {
    matches!(kind, MessageType::CreateRoom | MessageType::JoinRoom) || kind.is_relayed()
}
