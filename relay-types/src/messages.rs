//! Typed protocol messages.
//!
//! [`Message`] is the validated view of an [`Envelope`]: every variant
//! carries exactly the fields its type requires. Dispatch code matches on
//! `Message`; forwarding code keeps the original `Envelope`.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use std::str::FromStr;

use crate::{CodecError, Envelope, MessageType};

/// A room registration request (CREATE_ROOM / JOIN_ROOM).
///
/// PIN and role are kept as sent; the registry validates them in protocol
/// order (PIN first, then role).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRequest {
    /// PIN as sent by the peer
    pub pin: String,
    /// Device type as sent by the peer
    pub device_type: String,
}

/// All protocol messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Register in a room
    CreateRoom(RoomRequest),
    /// Register in a room (client spelling)
    JoinRoom(RoomRequest),
    /// Server registration ack
    RoomCreated {
        /// Room PIN
        pin: String,
    },
    /// Client registration ack
    Connected {
        /// Room PIN
        pin: String,
    },
    /// A client joined the server's room
    ClientConnected,
    /// The client left
    ClientDisconnected,
    /// The server left
    ServerDisconnected,
    /// Control instruction
    Command {
        /// Command name, e.g. `TAKE_PHOTO`
        command: String,
    },
    /// Text status
    Response {
        /// Status text
        message: String,
    },
    /// Binary payload
    Image {
        /// Base64 of the image bytes
        data: String,
    },
    /// Relay rejection or diagnostic
    Error {
        /// Human-readable reason
        message: String,
    },
}

impl Message {
    /// The discriminator of this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::CreateRoom(_) => MessageType::CreateRoom,
            Self::JoinRoom(_) => MessageType::JoinRoom,
            Self::RoomCreated { .. } => MessageType::RoomCreated,
            Self::Connected { .. } => MessageType::Connected,
            Self::ClientConnected => MessageType::ClientConnected,
            Self::ClientDisconnected => MessageType::ClientDisconnected,
            Self::ServerDisconnected => MessageType::ServerDisconnected,
            Self::Command { .. } => MessageType::Command,
            Self::Response { .. } => MessageType::Response,
            Self::Image { .. } => MessageType::Image,
            Self::Error { .. } => MessageType::Error,
        }
    }

    /// Decode and validate a text frame in one step.
    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        Self::try_from(&Envelope::from_json(text)?)
    }

    /// Encode to a JSON text frame.
    pub fn to_json(&self) -> Result<String, CodecError> {
        Envelope::from(self.clone()).to_json()
    }

    /// Build an IMAGE message from raw bytes.
    pub fn image(bytes: &[u8]) -> Self {
        Self::Image {
            data: encode_image(bytes),
        }
    }
}

fn required(field: Option<&String>, name: &'static str) -> Result<String, CodecError> {
    field.cloned().ok_or(CodecError::MissingField(name))
}

impl TryFrom<&Envelope> for Message {
    type Error = CodecError;

    fn try_from(env: &Envelope) -> Result<Self, CodecError> {
        let msg_type = env.message_type()?;
        let room_request = || match (&env.pin, &env.device_type) {
            (Some(pin), Some(device_type)) => Ok(RoomRequest {
                pin: pin.clone(),
                device_type: device_type.clone(),
            }),
            _ => Err(CodecError::MissingRoomFields),
        };

        Ok(match msg_type {
            MessageType::CreateRoom => Self::CreateRoom(room_request()?),
            MessageType::JoinRoom => Self::JoinRoom(room_request()?),
            MessageType::RoomCreated => Self::RoomCreated {
                pin: required(env.pin.as_ref(), "pin")?,
            },
            MessageType::Connected => Self::Connected {
                pin: required(env.pin.as_ref(), "pin")?,
            },
            MessageType::ClientConnected => Self::ClientConnected,
            MessageType::ClientDisconnected => Self::ClientDisconnected,
            MessageType::ServerDisconnected => Self::ServerDisconnected,
            MessageType::Command => Self::Command {
                command: required(env.command.as_ref(), "command")?,
            },
            MessageType::Response => Self::Response {
                message: required(env.message.as_ref(), "message")?,
            },
            MessageType::Image => Self::Image {
                data: required(env.data.as_ref(), "data")?,
            },
            MessageType::Error => Self::Error {
                message: required(env.message.as_ref(), "message")?,
            },
        })
    }
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        let mut env = Envelope::new(message.message_type());
        match message {
            Message::CreateRoom(req) | Message::JoinRoom(req) => {
                env.pin = Some(req.pin);
                env.device_type = Some(req.device_type);
            }
            Message::RoomCreated { pin } | Message::Connected { pin } => env.pin = Some(pin),
            Message::Command { command } => env.command = Some(command),
            Message::Response { message } | Message::Error { message } => {
                env.message = Some(message)
            }
            Message::Image { data } => env.data = Some(data),
            Message::ClientConnected
            | Message::ClientDisconnected
            | Message::ServerDisconnected => {}
        }
        env
    }
}

/// Remote camera commands understood by camera peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Switch to photo mode and capture
    TakePhoto,
    /// Switch to video mode and toggle recording
    Record,
    /// Stop an ongoing recording
    StopRecord,
    /// Swap front/back lens
    FlipCamera,
}

impl Command {
    /// All known commands.
    pub const ALL: [Command; 4] = [
        Self::TakePhoto,
        Self::Record,
        Self::StopRecord,
        Self::FlipCamera,
    ];

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TakePhoto => "TAKE_PHOTO",
            Self::Record => "RECORD",
            Self::StopRecord => "STOP_RECORD",
            Self::FlipCamera => "FLIP_CAMERA",
        }
    }
}

impl FromStr for Command {
    type Err = CodecError;

    /// Case-insensitive, so `take_photo` is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| CodecError::UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Self::Command {
            command: command.as_str().to_string(),
        }
    }
}

/// Encode image bytes for an IMAGE envelope.
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode the `data` field of an IMAGE envelope.
///
/// Line breaks are tolerated since some encoders wrap at 76 columns.
pub fn decode_image(data: &str) -> Result<Vec<u8>, CodecError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_requires_pin_and_device_type() {
        let env = Envelope::from_json(r#"{"type":"CREATE_ROOM","pin":"1234"}"#).unwrap();
        let err = Message::try_from(&env).unwrap_err();
        assert_eq!(err.to_string(), "PIN and deviceType are required");

        let env = Envelope::from_json(r#"{"type":"JOIN_ROOM","deviceType":"CLIENT"}"#).unwrap();
        assert!(matches!(
            Message::try_from(&env),
            Err(CodecError::MissingRoomFields)
        ));
    }

    #[test]
    fn room_request_keeps_raw_values() {
        let msg =
            Message::from_json(r#"{"type":"JOIN_ROOM","pin":"12x","deviceType":"TV"}"#).unwrap();
        assert_eq!(
            msg,
            Message::JoinRoom(RoomRequest {
                pin: "12x".into(),
                device_type: "TV".into(),
            })
        );
    }

    #[test]
    fn per_type_required_fields() {
        let cases = [
            (r#"{"type":"COMMAND"}"#, "command is required"),
            (r#"{"type":"RESPONSE"}"#, "message is required"),
            (r#"{"type":"IMAGE"}"#, "data is required"),
            (r#"{"type":"ERROR"}"#, "message is required"),
        ];
        for (text, expected) in cases {
            assert_eq!(Message::from_json(text).unwrap_err().to_string(), expected);
        }
    }

    #[test]
    fn notifications_need_no_fields() {
        assert_eq!(
            Message::from_json(r#"{"type":"SERVER_DISCONNECTED"}"#).unwrap(),
            Message::ServerDisconnected
        );
    }

    #[test]
    fn message_to_envelope_sets_only_its_fields() {
        let env = Envelope::from(Message::RoomCreated { pin: "1234".into() });
        assert_eq!(env.to_json().unwrap(), r#"{"type":"ROOM_CREATED","pin":"1234"}"#);

        let env = Envelope::from(Message::from(Command::TakePhoto));
        assert_eq!(env.to_json().unwrap(), r#"{"type":"COMMAND","command":"TAKE_PHOTO"}"#);
    }

    #[test]
    fn command_parse_is_case_insensitive() {
        assert_eq!("take_photo".parse::<Command>().unwrap(), Command::TakePhoto);
        assert_eq!("FLIP_CAMERA".parse::<Command>().unwrap(), Command::FlipCamera);
        assert!("ZOOM".parse::<Command>().is_err());
    }

    #[test]
    fn stop_record_is_part_of_the_vocabulary() {
        assert_eq!("stop_record".parse::<Command>().unwrap(), Command::StopRecord);
        assert_eq!(Command::StopRecord.to_string(), "STOP_RECORD");
        assert!(Command::ALL
            .iter()
            .all(|c| c.as_str().parse::<Command>().unwrap() == *c));
    }

    #[test]
    fn envelope_with_error_type_converts() {
        let env = Envelope::from_json(r#"{"type":"ERROR","message":"Not in a room"}"#).unwrap();
        assert_eq!(
            Message::try_from(&env).unwrap(),
            Message::Error {
                message: "Not in a room".into()
            }
        );
    }

    #[test]
    fn image_payload_decodes() {
        let bytes = [0xFFu8, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        let msg = Message::image(&bytes);
        let Message::Image { data } = msg else {
            panic!("expected image");
        };
        assert_eq!(decode_image(&data).unwrap(), bytes);

        let wrapped = format!("{}\n{}", &data[..4], &data[4..]);
        assert_eq!(decode_image(&wrapped).unwrap(), bytes);
    }

    #[test]
    fn image_rejects_garbage() {
        assert!(matches!(decode_image("not*base64"), Err(CodecError::Base64(_))));
    }
}
