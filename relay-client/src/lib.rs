//! # relay-client
//!
//! Peer library for the camera relay.
//!
//! This is the library that camera and controller applications use to meet
//! through the relay.
//!
//! ## Features
//!
//! - **PIN rendezvous**: join a room as SERVER (camera) or CLIENT (controller)
//! - **Role Policies**: each role may only send and receive its own traffic
//! - **Transport Abstraction**: Pluggable transport layer (WebSocket, mock)
//! - **Pure State Machine**: Uses relay-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use relay_client::{CameraPolicy, PeerEvent, RelayClient, WsTransport};
//!
//! let camera = RelayClient::new(WsTransport::new(), CameraPolicy);
//! camera.connect("ws://127.0.0.1:8080/camera-relay", "1234").await?;
//!
//! while let Ok(event) = camera.next_event().await {
//!     if let PeerEvent::Command { command } = event {
//!         camera.send_response(format!("{command} done")).await?;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod transport;

pub use client::{ClientError, RelayClient};
pub use relay_core::{CameraPolicy, ControllerPolicy, PeerEvent, PeerState, RolePolicy, SendRefused};
pub use transport::{MockTransport, Transport, TransportError, WsTransport};
