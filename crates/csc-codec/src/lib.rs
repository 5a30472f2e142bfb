//! # CSC Codec
//!
//! Decoding for the Bluetooth SIG Cycling Speed and Cadence (CSC) measurement
//! characteristic, and the revolution-rate estimator that turns its cumulative
//! counters into RPM.
//!
//! Everything here is pure and bounded-time: safe to run inline on the
//! notification-delivery thread, no blocking, no I/O.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod frame;
pub mod revolution;

pub use frame::{CrankData, CscFrame, FrameError, WheelData};
pub use revolution::{wrap_diff, RevolutionCounter};

use uuid::Uuid;

/// Cycling Speed and Cadence Service UUID (0x1816)
pub const CSC_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1816_0000_1000_8000_0080_5f9b_34fb);

/// CSC Measurement Characteristic UUID (0x2A5B)
pub const CSC_MEASUREMENT_UUID: Uuid = Uuid::from_u128(0x0000_2a5b_0000_1000_8000_0080_5f9b_34fb);

/// Client Characteristic Configuration Descriptor UUID (0x2902); the transport
/// writes this to enable notifications during service discovery
pub const CLIENT_CHARACTERISTIC_CONFIG_UUID: Uuid =
    Uuid::from_u128(0x0000_2902_0000_1000_8000_0080_5f9b_34fb);

/// Flags bit 0: wheel revolution fields present
pub const WHEEL_REV_DATA_PRESENT: u8 = 0x01;

/// Flags bit 1: crank revolution fields present
pub const CRANK_REV_DATA_PRESENT: u8 = 0x02;
