//! # CSC Protocol
//!
//! Shared types for the sensor link: connection states, UI-facing commands and
//! events, and the measurement snapshots published to subscribers.
//!
//! This crate is deliberately free of I/O and async machinery so that every
//! other crate in the workspace can depend on it without pulling in a runtime.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod errors;
pub mod messages;
pub mod state;

pub use errors::LinkError;
pub use messages::{
    ConnectionStatus, CscUpdate, DeviceHandle, SensorCommand, SensorEvent,
    DEFAULT_WHEEL_CIRCUMFERENCE_MM,
};
pub use state::LinkState;
