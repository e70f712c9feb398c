//! # camera-relay-server
//!
//! PIN rendezvous and WebSocket relay for remote camera control.
//!
//! This crate implements a relay server that:
//! - Accepts WebSocket connections from camera (SERVER) and remote (CLIENT) devices
//! - Pairs one SERVER and one CLIENT per 4-digit PIN
//! - Forwards commands, responses and images between the paired peers
//! - Keeps nothing once a room empties (no persistence)
//!
//! ## Architecture
//!
//! ```text
//! Camera ──┐                        ┌── Remote
//!          │   WebSocket (JSON)     │
//!          ├───────────────────────►│
//!          │                        │
//!      ┌───┴────────────────────────┴───┐
//!      │         camera-relay           │
//!      │  ┌──────────────────────────┐  │
//!      │  │ RoomRegistry (PIN→Room)  │  │
//!      │  └──────────────────────────┘  │
//!      └────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! Every frame is one JSON envelope with a `type` field:
//! - CREATE_ROOM / JOIN_ROOM → ROOM_CREATED or CONNECTED (registration)
//! - COMMAND (remote → camera), RESPONSE and IMAGE (camera → remote), relayed verbatim
//! - CLIENT_CONNECTED, CLIENT_DISCONNECTED, SERVER_DISCONNECTED (relay notifications)
//! - ERROR (relay → either side)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod limits;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;

pub use config::Config;
pub use error::{RelayError, Result};
pub use server::CameraRelay;
