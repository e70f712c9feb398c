//! # relay-core
//!
//! Pure peer logic for the camera relay (no I/O, instant tests).
//!
//! This crate implements the state machine a camera or controller runs
//! against the relay, without any network I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//!
//! The actual I/O is performed by `relay-client`, which interprets the
//! actions produced by [`PeerState`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod policy;
pub mod state;

pub use policy::{CameraPolicy, ControllerPolicy, RolePolicy};
pub use state::{Action, Event, PeerEvent, PeerState, SendRefused, LEGACY_IMAGE_THRESHOLD};
