//! Error types for the relay wire format.
//!
//! The `Display` text of the validation variants is exactly the text the
//! relay puts in the `message` field of an `ERROR` envelope.

use thiserror::Error;

/// Errors that can occur while decoding or validating envelopes.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The frame is not a JSON object with a string `type`.
    #[error("Invalid JSON format")]
    Json(#[source] serde_json::Error),

    /// The `type` field names no known message.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// CREATE_ROOM / JOIN_ROOM without `pin` or `deviceType`.
    #[error("PIN and deviceType are required")]
    MissingRoomFields,

    /// A required per-type field is absent.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// PIN is not exactly four decimal digits.
    #[error("PIN must be 4 digits")]
    InvalidPin,

    /// `deviceType` is neither SERVER nor CLIENT.
    #[error("Invalid device type. Use SERVER or CLIENT")]
    InvalidDeviceType(String),

    /// Command string outside the known vocabulary.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Embedded binary payload is not valid Base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}
