//! # Sensor Actors
//!
//! The actors that make up the sensor link:
//!
//! - **LinkActor**: connection state machine. Owns the scan/connect/ready
//!   lifecycle and the automatic rescan after a drop.
//! - **PipelineActor**: decodes CSC notifications and runs the revolution-rate
//!   estimators, one per axis.
//! - **UpdatePublisher**: deliver-latest fan-out of measurements and
//!   connection status to any number of subscribers.
//! - **TransportLink**: the thin adapter a platform BLE transport calls into.
//!
//! Actors communicate only through the channels in [`sensor_runtime`]; the
//! transport itself is out of scope and talks to the system via
//! [`TransportLink`].

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod link_actor;
pub mod pipeline_actor;
pub mod publisher;
pub mod transport;

pub use link_actor::LinkActor;
pub use pipeline_actor::PipelineActor;
pub use publisher::UpdatePublisher;
pub use transport::TransportLink;
