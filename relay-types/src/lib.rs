//! # relay-types
//!
//! Wire format types for the camera relay rendezvous protocol.
//!
//! This crate provides the foundational types shared by the relay server and
//! the peer library:
//! - [`Pin`], [`DeviceRole`] - Room identity and device roles
//! - [`Envelope`] - The JSON object exchanged over the WebSocket
//! - [`Message`] - Validated, typed view of an envelope
//! - [`Command`] - Closed vocabulary of remote camera commands
//! - [`CodecError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;
mod messages;

pub use envelope::{Envelope, MessageType};
pub use error::CodecError;
pub use ids::{DeviceRole, Pin, PIN_LENGTH};
pub use messages::{decode_image, encode_image, Command, Message, RoomRequest};
