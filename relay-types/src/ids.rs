//! Room identity and device role types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CodecError;

/// Number of decimal digits in a room PIN.
pub const PIN_LENGTH: usize = 4;

/// A validated room PIN: exactly four ASCII decimal digits.
///
/// The PIN is the only secret shared by the two peers of a room.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pin(String);

impl Pin {
    /// Parse and validate a PIN.
    pub fn parse(raw: &str) -> Result<Self, CodecError> {
        if raw.len() == PIN_LENGTH && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(CodecError::InvalidPin)
        }
    }

    /// Get the PIN as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Pin {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Pin {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pin> for String {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin({})", self.0)
    }
}

/// The role a device plays inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceRole {
    /// The capability-providing device (the camera).
    Server,
    /// The controlling device (the remote).
    Client,
}

impl DeviceRole {
    /// Wire representation (`SERVER` / `CLIENT`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "SERVER",
            Self::Client => "CLIENT",
        }
    }

    /// The role on the other side of a room.
    pub fn peer(&self) -> Self {
        match self {
            Self::Server => Self::Client,
            Self::Client => Self::Server,
        }
    }
}

impl FromStr for DeviceRole {
    type Err = CodecError;

    /// Matching is exact: peers must send `SERVER` or `CLIENT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SERVER" => Ok(Self::Server),
            "CLIENT" => Ok(Self::Client),
            other => Err(CodecError::InvalidDeviceType(other.to_string())),
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
