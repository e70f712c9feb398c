//! RelayClient - the main interface for camera and controller peers.
//!
//! # Architecture
//!
//! RelayClient uses a pure state machine (from relay-core) for protocol logic
//! and interprets the actions to perform actual I/O via the Transport trait.
//!
//! ```text
//! Application → RelayClient → Transport → Relay
//!                    ↓
//!              relay-core (pure state machine + role policy)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use relay_client::{ControllerPolicy, RelayClient, WsTransport};
//!
//! let client = RelayClient::new(WsTransport::new(), ControllerPolicy);
//! client.connect("ws://127.0.0.1:8080/camera-relay", "1234").await?;
//! client.send_command(Command::TakePhoto).await?;
//! let event = client.next_event().await?;
//! ```

use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Mutex;

use relay_core::{Action, Event, PeerEvent, PeerState, RolePolicy, SendRefused};
use relay_types::{CodecError, Command, Message, Pin};

use crate::transport::{Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Encoding error or invalid PIN.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The relay refused the registration.
    #[error("join rejected: {0}")]
    JoinRejected(String),

    /// A send was refused before reaching the relay.
    #[error("send refused: {0}")]
    SendRefused(#[from] SendRefused),

    /// Not connected to relay.
    #[error("not connected")]
    NotConnected,
}

/// A camera or controller connected through the relay.
///
/// Role behavior is supplied by `P`: [`relay_core::CameraPolicy`] or
/// [`relay_core::ControllerPolicy`].
pub struct RelayClient<T: Transport, P: RolePolicy> {
    transport: T,
    policy: P,
    state: Mutex<PeerState>,
    pending: Mutex<VecDeque<PeerEvent>>,
}

impl<T: Transport, P: RolePolicy + Send + Sync> RelayClient<T, P> {
    /// Create a new RelayClient.
    pub fn new(transport: T, policy: P) -> Self {
        Self {
            transport,
            policy,
            state: Mutex::new(PeerState::new()),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Connect to the relay at `url` and register in room `pin`.
    ///
    /// Returns once the relay acknowledges the registration. Events that
    /// arrive alongside the acknowledgement are kept for [`Self::next_event`].
    pub async fn connect(&self, url: &str, pin: &str) -> Result<(), ClientError> {
        let pin = Pin::parse(pin)?;
        self.step(Event::ConnectRequested { pin: pin.clone() }).await?;

        if let Err(e) = self.transport.connect(url).await {
            self.step(Event::TransportFailed {
                error: e.to_string(),
            })
            .await?;
            return Err(ClientError::ConnectionFailed(e.to_string()));
        }
        self.step(Event::TransportOpened).await?;

        loop {
            let message = match self.recv_message().await {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => {
                    self.step(Event::TransportFailed {
                        error: e.to_string(),
                    })
                    .await?;
                    return Err(e.into());
                }
            };

            for event in self.step(Event::MessageReceived(message)).await? {
                match event {
                    PeerEvent::JoinRejected { reason } => {
                        tracing::warn!("Relay rejected registration in room {}: {}", pin, reason);
                        return Err(ClientError::JoinRejected(reason));
                    }
                    PeerEvent::Joined { pin, role } => {
                        tracing::info!("Joined room {} as {}", pin, role);
                    }
                    other => self.pending.lock().await.push_back(other),
                }
            }

            if self.state.lock().await.is_registered() {
                return Ok(());
            }
        }
    }

    /// Check if the relay has accepted our registration.
    pub async fn is_registered(&self) -> bool {
        self.state.lock().await.is_registered()
    }

    /// Check if the other side of the room is present.
    pub async fn is_paired(&self) -> bool {
        self.state.lock().await.is_paired()
    }

    /// Snapshot of the peer state.
    pub async fn state(&self) -> PeerState {
        self.state.lock().await.clone()
    }

    /// Send a command to the camera (controller only).
    pub async fn send_command(&self, command: Command) -> Result<(), ClientError> {
        self.send(command.into()).await
    }

    /// Send a text response to the controller (camera only).
    pub async fn send_response(&self, message: impl Into<String>) -> Result<(), ClientError> {
        self.send(Message::Response {
            message: message.into(),
        })
        .await
    }

    /// Send image bytes to the controller (camera only).
    pub async fn send_image(&self, bytes: &[u8]) -> Result<(), ClientError> {
        self.send(Message::image(bytes)).await
    }

    /// Wait for the next event from the relay.
    ///
    /// Messages this role does not handle are skipped. After the transport
    /// ends, the final `Disconnected` event is returned once and later calls
    /// fail with [`ClientError::NotConnected`].
    pub async fn next_event(&self) -> Result<PeerEvent, ClientError> {
        loop {
            if let Some(event) = self.pending.lock().await.pop_front() {
                return Ok(event);
            }
            if self.state.lock().await.pin().is_none() {
                return Err(ClientError::NotConnected);
            }

            let event = match self.recv_message().await {
                Ok(Some(message)) => Event::MessageReceived(message),
                Ok(None) => continue,
                Err(TransportError::ConnectionClosed) => Event::TransportClosed,
                Err(e) => Event::TransportFailed {
                    error: e.to_string(),
                },
            };

            let events = self.step(event).await?;
            let mut pending = self.pending.lock().await;
            for event in events {
                match event {
                    PeerEvent::Ignored { kind } => {
                        tracing::debug!("Ignoring {} from relay", kind);
                    }
                    other => pending.push_back(other),
                }
            }
        }
    }

    /// Disconnect from the relay.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.step(Event::DisconnectRequested).await?;
        self.pending.lock().await.clear();
        Ok(())
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(&self, message: Message) -> Result<(), ClientError> {
        for event in self.step(Event::SendRequested(message)).await? {
            if let PeerEvent::SendRefused(reason) = event {
                return Err(reason.into());
            }
        }
        Ok(())
    }

    /// Read one frame; `None` when it does not decode.
    async fn recv_message(&self) -> Result<Option<Message>, TransportError> {
        let text = self.transport.recv().await?;
        match Message::from_json(&text) {
            Ok(message) => Ok(Some(message)),
            Err(e) => {
                tracing::warn!("Dropping undecodable frame from relay: {}", e);
                Ok(None)
            }
        }
    }

    /// Feed one event to the state machine and execute the resulting actions.
    ///
    /// Returns the events to surface to the application.
    async fn step(&self, event: Event) -> Result<Vec<PeerEvent>, ClientError> {
        let actions = {
            let mut state = self.state.lock().await;
            let (next, actions) = state.clone().on_event(&self.policy, event);
            *state = next;
            actions
        };

        let mut events = Vec::new();
        for action in actions {
            match action {
                // `connect` opens the transport itself since it holds the URL.
                Action::Connect => {}
                Action::Send(message) => {
                    let text = message.to_json()?;
                    self.transport.send(&text).await?;
                }
                Action::Disconnect => self.transport.close().await?,
                Action::EmitEvent(event) => events.push(event),
            }
        }
        Ok(events)
    }
}
