//! Envelope - the JSON object carried in every WebSocket text frame.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CodecError;

/// Message type discriminator carried in the envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Register as SERVER (or CLIENT) in a room
    CreateRoom,
    /// Alias of CreateRoom, conventionally sent by clients
    JoinRoom,
    /// Ack for a successful SERVER registration
    RoomCreated,
    /// Ack for a successful CLIENT registration
    Connected,
    /// A client is now bound to the server's room
    ClientConnected,
    /// The client left the room
    ClientDisconnected,
    /// The server left the room
    ServerDisconnected,
    /// Control instruction, client to server
    Command,
    /// Text status, server to client
    Response,
    /// Base64 binary payload, server to client
    Image,
    /// Rejection or diagnostic from the relay
    Error,
}

impl MessageType {
    /// All message types, in protocol order.
    pub const ALL: [MessageType; 11] = [
        Self::CreateRoom,
        Self::JoinRoom,
        Self::RoomCreated,
        Self::Connected,
        Self::ClientConnected,
        Self::ClientDisconnected,
        Self::ServerDisconnected,
        Self::Command,
        Self::Response,
        Self::Image,
        Self::Error,
    ];

    /// Wire representation of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateRoom => "CREATE_ROOM",
            Self::JoinRoom => "JOIN_ROOM",
            Self::RoomCreated => "ROOM_CREATED",
            Self::Connected => "CONNECTED",
            Self::ClientConnected => "CLIENT_CONNECTED",
            Self::ClientDisconnected => "CLIENT_DISCONNECTED",
            Self::ServerDisconnected => "SERVER_DISCONNECTED",
            Self::Command => "COMMAND",
            Self::Response => "RESPONSE",
            Self::Image => "IMAGE",
            Self::Error => "ERROR",
        }
    }

    /// Whether the relay forwards this type between paired peers.
    pub fn is_relayed(&self) -> bool {
        matches!(self, Self::Command | Self::Response | Self::Image)
    }
}

impl FromStr for MessageType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CodecError::UnknownMessageType(s.to_string()))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The envelope exchanged between peers and the relay.
///
/// Only `type` is required on the wire. Absent fields are omitted when
/// encoding, never written as `null`, and unrecognised fields are kept in
/// `extra` so a forwarded envelope leaves the relay with the shape it
/// arrived in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Raw `type` discriminator (see [`Envelope::message_type`])
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Room PIN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    /// `SERVER` or `CLIENT`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Command name for COMMAND
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Text for RESPONSE and ERROR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Base64 payload for IMAGE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Any other fields, preserved verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Envelope {
    /// Create an envelope carrying only a type.
    pub fn new(msg_type: MessageType) -> Self {
        Self {
            msg_type: msg_type.as_str().to_string(),
            ..Self::default()
        }
    }

    /// Create an ERROR envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(MessageType::Error)
        }
    }

    /// Decode a text frame.
    ///
    /// Fails only when the frame is not a JSON object with a string `type`;
    /// an unknown type still decodes and is reported by
    /// [`Envelope::message_type`].
    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        serde_json::from_str(text).map_err(CodecError::Json)
    }

    /// Encode to a JSON text frame.
    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Json)
    }

    /// Get the message type as an enum.
    pub fn message_type(&self) -> Result<MessageType, CodecError> {
        self.msg_type.parse()
    }
}
