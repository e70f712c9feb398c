//! Peer state machine for camera-relay.
//!
//! This module provides a pure, side-effect-free state machine for one peer
//! of a room. The state machine takes events as input and produces a new
//! state plus a list of actions to execute.
//!
//! The actual I/O (opening the socket, sending frames) is performed by
//! relay-client, not by this module. Role differences come from the
//! [`RolePolicy`] passed to [`PeerState::on_event`].

use crate::policy::RolePolicy;
use relay_types::{decode_image, DeviceRole, Message, MessageType, Pin};
use thiserror::Error;

/// Peer state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerState {
    /// No transport.
    Disconnected,
    /// Transport connection in progress.
    Connecting {
        /// Room to register in once connected.
        pin: Pin,
    },
    /// Registration sent, waiting for the relay's answer.
    Joining {
        /// Room being registered in.
        pin: Pin,
    },
    /// Registered; the other slot of the room is empty.
    WaitingForPeer {
        /// Room the peer is bound to.
        pin: Pin,
    },
    /// Registered and the other side is present.
    Paired {
        /// Room the peer is bound to.
        pin: Pin,
    },
}

impl PeerState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (relay-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, policy: &impl RolePolicy, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Disconnected
            (Self::Disconnected, Event::ConnectRequested { pin }) => {
                (Self::Connecting { pin }, vec![Action::Connect])
            }

            // From Connecting
            (Self::Connecting { pin }, Event::TransportOpened) => {
                let registration = policy.registration(&pin);
                (Self::Joining { pin }, vec![Action::Send(registration)])
            }
            (Self::Connecting { .. }, Event::TransportFailed { error }) => (
                Self::Disconnected,
                vec![Action::EmitEvent(PeerEvent::ConnectionFailed { error })],
            ),

            // Any connected state
            (state, Event::TransportFailed { error }) if state.has_transport() => (
                Self::Disconnected,
                vec![Action::EmitEvent(PeerEvent::Disconnected { reason: error })],
            ),
            (state, Event::TransportClosed) if state.has_transport() => (
                Self::Disconnected,
                vec![Action::EmitEvent(PeerEvent::Disconnected {
                    reason: "connection closed".into(),
                })],
            ),
            (state, Event::DisconnectRequested) if state != Self::Disconnected => (
                Self::Disconnected,
                vec![
                    Action::Disconnect,
                    Action::EmitEvent(PeerEvent::Disconnected {
                        reason: "user requested".into(),
                    }),
                ],
            ),

            (state, Event::MessageReceived(message)) => state.on_message(policy, message),
            (state, Event::SendRequested(message)) => state.on_send(policy, message),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    fn on_message(self, policy: &impl RolePolicy, message: Message) -> (Self, Vec<Action>) {
        let kind = message.message_type();
        if !(self.is_joining() || self.is_registered()) || !policy.accepts(kind) {
            return (self, vec![Action::EmitEvent(PeerEvent::Ignored { kind })]);
        }

        match (self, message) {
            // Registration answer
            (Self::Joining { pin }, _) if kind == policy.ack_type() => {
                let mut actions = vec![Action::EmitEvent(PeerEvent::Joined {
                    pin: pin.clone(),
                    role: policy.role(),
                })];
                if policy.paired_on_ack() {
                    actions.push(Action::EmitEvent(PeerEvent::PeerJoined));
                    (Self::Paired { pin }, actions)
                } else {
                    (Self::WaitingForPeer { pin }, actions)
                }
            }
            (Self::Joining { .. }, Message::Error { message }) => (
                Self::Disconnected,
                vec![
                    Action::Disconnect,
                    Action::EmitEvent(PeerEvent::JoinRejected { reason: message }),
                ],
            ),

            // Peer presence
            (Self::WaitingForPeer { pin }, _) if Some(kind) == policy.peer_joined_type() => (
                Self::Paired { pin },
                vec![Action::EmitEvent(PeerEvent::PeerJoined)],
            ),
            (Self::Paired { pin }, _) if kind == policy.peer_left_type() => (
                Self::WaitingForPeer { pin },
                vec![Action::EmitEvent(PeerEvent::PeerLeft)],
            ),

            // A relayed payload proves the peer is back.
            (Self::WaitingForPeer { pin }, message)
                if policy.inbound_payloads().contains(&kind) =>
            {
                let mut actions = vec![Action::EmitEvent(PeerEvent::PeerJoined)];
                actions.extend(payload_event(message).map(Action::EmitEvent));
                (Self::Paired { pin }, actions)
            }

            // Payloads and relay errors once registered
            (state, message) if state.is_registered() => {
                let event = payload_event(message).unwrap_or(PeerEvent::Ignored { kind });
                (state, vec![Action::EmitEvent(event)])
            }

            (state, _) => (state, vec![Action::EmitEvent(PeerEvent::Ignored { kind })]),
        }
    }

    fn on_send(self, policy: &impl RolePolicy, message: Message) -> (Self, Vec<Action>) {
        let kind = message.message_type();
        let refusal = if !policy.may_send(kind) {
            Some(SendRefused::NotPermitted {
                kind,
                role: policy.role(),
            })
        } else if !self.is_registered() {
            Some(SendRefused::NotRegistered)
        } else if !self.is_paired() && !policy.sends_while_waiting() {
            Some(SendRefused::PeerNotConnected)
        } else {
            None
        };

        match refusal {
            Some(reason) => (self, vec![Action::EmitEvent(PeerEvent::SendRefused(reason))]),
            None => (self, vec![Action::Send(message)]),
        }
    }

    /// The room this peer is (or is becoming) part of.
    pub fn pin(&self) -> Option<&Pin> {
        match self {
            Self::Disconnected => None,
            Self::Connecting { pin }
            | Self::Joining { pin }
            | Self::WaitingForPeer { pin }
            | Self::Paired { pin } => Some(pin),
        }
    }

    /// Check if the relay has accepted the registration.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::WaitingForPeer { .. } | Self::Paired { .. })
    }

    /// Check if the other side of the room is present.
    pub fn is_paired(&self) -> bool {
        matches!(self, Self::Paired { .. })
    }

    fn is_joining(&self) -> bool {
        matches!(self, Self::Joining { .. })
    }

    fn has_transport(&self) -> bool {
        !matches!(self, Self::Disconnected | Self::Connecting { .. })
    }
}

/// RESPONSE messages longer than this may carry a Base64 image from older
/// cameras that predate IMAGE.
pub const LEGACY_IMAGE_THRESHOLD: usize = 100;

/// Application event for a relayed payload or relay error.
fn payload_event(message: Message) -> Option<PeerEvent> {
    match message {
        Message::Command { command } => Some(PeerEvent::Command { command }),
        Message::Response { message } if is_legacy_image(&message) => {
            Some(PeerEvent::Image { data: message })
        }
        Message::Response { message } => Some(PeerEvent::Response { message }),
        Message::Image { data } => Some(PeerEvent::Image { data }),
        Message::Error { message } => Some(PeerEvent::RelayError { message }),
        _ => None,
    }
}

fn is_legacy_image(message: &str) -> bool {
    message.len() > LEGACY_IMAGE_THRESHOLD && decode_image(message).is_ok()
}

impl Default for PeerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the peer lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Application asked to join room `pin`.
    ConnectRequested {
        /// Room to join.
        pin: Pin,
    },
    /// Transport connection succeeded.
    TransportOpened,
    /// Transport connection failed or broke.
    TransportFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The relay closed the connection.
    TransportClosed,
    /// A decoded message arrived from the relay.
    MessageReceived(Message),
    /// Application wants to send a payload to the peer.
    SendRequested(Message),
    /// Application asked to disconnect.
    DisconnectRequested,
}

/// Actions to be executed by relay-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the transport.
    Connect,
    /// Close the transport.
    Disconnect,
    /// Encode and send a message.
    Send(Message),
    /// Emit an event to the application.
    EmitEvent(PeerEvent),
}

/// Events emitted to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// The relay accepted the registration.
    Joined {
        /// Room joined.
        pin: Pin,
        /// Slot taken.
        role: DeviceRole,
    },
    /// The relay refused the registration.
    JoinRejected {
        /// Relay's reason, e.g. `Room already has a server`.
        reason: String,
    },
    /// The other side is now present.
    PeerJoined,
    /// The other side left; the room is still ours.
    PeerLeft,
    /// A command from the controller.
    Command {
        /// Command name.
        command: String,
    },
    /// A text response from the camera.
    Response {
        /// Response text.
        message: String,
    },
    /// An image from the camera.
    Image {
        /// Base64 image bytes.
        data: String,
    },
    /// The relay rejected something this peer sent.
    RelayError {
        /// Relay's reason.
        message: String,
    },
    /// A send was refused locally.
    SendRefused(SendRefused),
    /// A message arrived that this role does not handle.
    Ignored {
        /// Its type.
        kind: MessageType,
    },
    /// Transport could not be opened.
    ConnectionFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Transport ended.
    Disconnected {
        /// Reason for disconnection.
        reason: String,
    },
}

/// Why a send was refused before reaching the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendRefused {
    /// The role never sends this type.
    #[error("{role} cannot send {kind}")]
    NotPermitted {
        /// Refused type.
        kind: MessageType,
        /// Sender's role.
        role: DeviceRole,
    },
    /// No room yet.
    #[error("not registered in a room")]
    NotRegistered,
    /// Registered but alone in the room.
    #[error("peer not connected")]
    PeerNotConnected,
}
