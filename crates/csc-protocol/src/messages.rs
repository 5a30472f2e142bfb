use serde::{Deserialize, Serialize};

/// Wheel circumference of a common 700x23c road tyre, in millimetres.
/// Used when the rider has not measured their own wheel.
pub const DEFAULT_WHEEL_CIRCUMFERENCE_MM: u32 = 2096;

/// Identity of a discovered peripheral.
///
/// Opaque to consumers: the link actor owns the handle and releases it on
/// disconnect. Subscribers only ever see status snapshots, never the handle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Platform address or identifier string for the peripheral
    pub address: String,
    /// Advertised local name, when present in the advertisement
    pub name: Option<String>,
}

impl DeviceHandle {
    pub fn new(address: String, name: Option<String>) -> Self {
        Self { address, name }
    }
}

/// Commands from the UI layer to the sensor link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SensorCommand {
    /// Begin a service-filtered scan for a CSC sensor
    StartScan,

    /// Reconnect to the previously seen device, skipping discovery when a
    /// handle is still cached; falls back to scanning otherwise
    Connect,

    /// Tear everything down and return to Idle
    Stop,
}

/// Connection snapshot delivered to subscribers on every state transition
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub searching: bool,
    pub found: bool,
    pub connected: bool,
}

/// One decoded, rate-estimated measurement, published after every accepted
/// notification. Axes the notification did not carry keep their prior values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CscUpdate {
    pub wheel_revolutions: u32,
    pub wheel_rpm: f32,
    pub crank_revolutions: u32,
    pub crank_rpm: f32,
}

impl CscUpdate {
    /// Wheel-to-crank ratio. Undefined while the rider is not pedalling, so
    /// `None` when crank rpm is zero rather than a division by zero.
    pub fn gear_ratio(&self) -> Option<f32> {
        if self.crank_rpm == 0.0 {
            None
        } else {
            Some(self.wheel_rpm / self.crank_rpm)
        }
    }

    /// Ground speed in km/h for the given wheel circumference in millimetres.
    pub fn speed_kmh(&self, circumference_mm: u32) -> f32 {
        self.wheel_rpm * circumference_mm as f32 * 60.0 / 1000.0 / 1000.0
    }
}

/// Events from the sensor link to the UI layer.
///
/// Status and measurement snapshots travel through the publisher; this stream
/// carries the low-rate diagnostics that accompany them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensorEvent {
    /// Connection state changed; one event per transition, in order
    StatusChanged { status: ConnectionStatus },

    /// Human-readable status message (device names, reconnect notes)
    StatusUpdate { message: String },

    /// Non-fatal error (malformed frame, dropped transport command)
    Error { message: String },
}
