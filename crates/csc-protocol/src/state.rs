use crate::messages::ConnectionStatus;

/// # Sensor Link State Machine
///
/// One `LinkState` instance tracks the lifecycle of a single physical CSC
/// sensor, from the first scan through connection, notification streaming,
/// and the automatic rescan after a drop.
///
/// ## State Transition Diagram
///
/// ```text
///              start_scan()                device_matched
///   ┌──────┐ ───────────────► ┌──────────┐ ─────────────► ┌─────────────┐
///   │ Idle │                  │ Scanning │                │ DeviceFound │
///   └──────┘ ◄─── stop() ──── └──────────┘                └──────┬──────┘
///      ▲  │                        ▲                             │
///      │  │ connect()              │ automatic rescan            │ transport
///      │  │ (cached handle)        │                             │ connected
///      │  ▼                        │                             ▼
///      │ ┌────────────┐      ┌──────────────┐  disconnect  ┌────────────┐
///      │ │ Connecting │      │ Disconnected │ ◄─────────── │   Ready    │
///      │ └─────┬──────┘      └──────────────┘              └────────────┘
///      │       │ services_ready      ▲                           │
///      │       └────────────────────────────────────────────────►┘
///      │                             │ (connect failed / timeout)
///      └── stop() from any state ────┘
/// ```
///
/// ## State Invariants
///
/// - **Idle**: no scan running, no connection, no pending work
/// - **Scanning**: an open-ended service-filtered scan is in flight
/// - **DeviceFound**: scan stopped, device handle cached, connect requested
/// - **Connecting**: transport link established, waiting for service discovery
/// - **Ready**: notifications flowing into the decode pipeline
/// - **Disconnected**: transient; the machine immediately re-enters Scanning
///
/// Continuous reconnection is the default policy: a bike computer keeps
/// looking for its sensor until told to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LinkState {
    /// Nothing in flight, ready for a scan or a cached reconnect
    Idle,

    /// Actively scanning for a device advertising the CSC service
    Scanning,

    /// A matching device was discovered; scanning stopped, connect requested
    DeviceFound,

    /// Transport reports connected; waiting for service discovery to finish
    Connecting,

    /// Connected with notifications enabled and streaming
    Ready,

    /// Connection lost; transient state before the automatic rescan
    Disconnected,
}

impl LinkState {
    /// Validate if transition to new_state is allowed from current state
    pub fn can_transition_to(&self, new_state: LinkState) -> bool {
        use LinkState::*;

        match (self, new_state) {
            // stop() is legal from every state
            (_, Idle) => true,

            // From Idle
            (Idle, Scanning) => true,   // user starts a scan
            (Idle, Connecting) => true, // cached-handle reconnect short-circuit

            // From Scanning
            (Scanning, DeviceFound) => true, // advertisement matched the filter

            // From DeviceFound
            (DeviceFound, Connecting) => true,   // transport reports connected
            (DeviceFound, Disconnected) => true, // connect failed or timed out

            // From Connecting
            (Connecting, Connecting) => true,   // idempotent (duplicate event)
            (Connecting, Ready) => true,        // services discovered
            (Connecting, Disconnected) => true, // dropped mid-handshake

            // From Ready
            (Ready, Disconnected) => true, // transport disconnect

            // From Disconnected
            (Disconnected, Scanning) => true,   // automatic rescan
            (Disconnected, Connecting) => true, // cached-handle reconnect

            // All other transitions are invalid
            _ => false,
        }
    }

    /// The `{searching, found, connected}` snapshot this state presents to
    /// subscribers. This is the only connection information the UI layer sees.
    pub fn status(&self) -> ConnectionStatus {
        match self {
            LinkState::Idle | LinkState::Disconnected => ConnectionStatus {
                searching: false,
                found: false,
                connected: false,
            },
            LinkState::Scanning => ConnectionStatus {
                searching: true,
                found: false,
                connected: false,
            },
            // Scanning already stopped as a side effect of the match
            LinkState::DeviceFound | LinkState::Connecting => ConnectionStatus {
                searching: false,
                found: true,
                connected: false,
            },
            LinkState::Ready => ConnectionStatus {
                searching: false,
                found: false,
                connected: true,
            },
        }
    }
}
