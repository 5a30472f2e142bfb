//! # Sensor Runtime
//!
//! Runtime infrastructure for the sensor-link actor system.
//!
//! This crate defines:
//! - **Actor trait**: Base trait for all actors with lifecycle methods
//! - **Channel management**: Type-safe message routing between actors
//! - **Supervision**: Timeouts for operations that can stall
//!
//! ## Architecture
//!
//! The runtime follows these principles:
//! - **Zero shared state**: Each actor owns its data
//! - **Message passing**: Actors communicate via typed messages
//! - **Sequential processing**: Messages are handled one at a time
//! - **Failure isolation**: A malformed notification never crashes the link
//!
//! ## Example
//!
//! ```ignore
//! use sensor_runtime::{spawn_actor, ChannelManager};
//!
//! let (manager, handles) = ChannelManager::new();
//!
//! let link_actor = LinkActor::new(/* ... */);
//! spawn_actor(link_actor, handles.link_rx, handles.event_tx.clone());
//!
//! manager.send_command(SensorCommand::StartScan)?;
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod actor;
pub mod channels;
pub mod logging;
pub mod supervision;

pub use actor::{spawn_actor, Actor};
pub use channels::{ActorHandles, ChannelManager, LinkMessage, PipelineMessage, TransportCommand};
pub use supervision::{spawn_timeout, SupervisionConfig, TimeoutHandle};
