//! CLI command implementations.

pub mod camera;
pub mod control;
pub mod status;
