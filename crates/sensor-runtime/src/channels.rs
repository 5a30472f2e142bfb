use csc_protocol::{DeviceHandle, LinkState, SensorCommand, SensorEvent};
use futures_channel::mpsc;
use std::time::Instant;
use uuid::Uuid;

/// Messages processed by the link actor (connection state machine)
#[derive(Debug, Clone)]
pub enum LinkMessage {
    /// Commands from the UI layer
    Command(SensorCommand),

    /// Internal messages from the transport
    DeviceMatched {
        device: DeviceHandle,
    },
    TransportConnected,
    /// Service discovery finished and notifications are enabled
    ServicesReady,
    TransportDisconnected,

    /// Operation timeout (supervision)
    /// Sent when an operation doesn't complete within expected time
    OperationTimeout {
        operation: String,
        state: LinkState,
    },
}

/// Commands from the link actor to the transport
#[derive(Debug, Clone)]
pub enum TransportCommand {
    /// Begin scanning, matching only advertisements carrying this service
    StartScan { service: Uuid },
    StopScan,
    Connect { device: DeviceHandle },
    Disconnect,
}

/// Messages processed by the decode pipeline
#[derive(Debug, Clone)]
pub enum PipelineMessage {
    /// Raw characteristic notification payload
    Notification {
        payload: Vec<u8>,
        received_at: Instant,
    },
    /// Discard per-session estimator state (sent on disconnect and stop)
    Reset,
}

/// Handles for spawning actors
pub struct ActorHandles {
    pub link_rx: mpsc::Receiver<LinkMessage>,
    pub transport_rx: mpsc::Receiver<TransportCommand>,
    pub pipeline_rx: mpsc::Receiver<PipelineMessage>,
    pub event_tx: mpsc::Sender<SensorEvent>,
}

/// Channel manager for actor communication
///
/// This manages all communication channels between actors and provides
/// a unified interface for sending commands from the UI layer.
pub struct ChannelManager {
    // Senders for each actor (all Clone)
    // Using bounded channels to prevent memory exhaustion under high load
    link_tx: mpsc::Sender<LinkMessage>,
    transport_tx: mpsc::Sender<TransportCommand>,
    pipeline_tx: mpsc::Sender<PipelineMessage>,

    // Event receiver, taken once by the UI layer
    event_rx: mpsc::Receiver<SensorEvent>,
}

impl ChannelManager {
    /// Create a new channel manager and actor handles
    ///
    /// Returns (ChannelManager for the UI layer, ActorHandles for spawning actors)
    ///
    /// Channel capacities:
    /// - link_tx: 256 - State coordination messages (low frequency)
    /// - transport_tx: 128 - Transport control messages (low frequency)
    /// - pipeline_tx: 1024 - Notification payloads (about 1 Hz per sensor, but
    ///   bursts on reconnect when the stack flushes queued notifications)
    /// - event_tx: 1024 - Diagnostics for the UI layer
    pub fn new() -> (Self, ActorHandles) {
        let (link_tx, link_rx) = mpsc::channel(256);
        let (transport_tx, transport_rx) = mpsc::channel(128);
        let (pipeline_tx, pipeline_rx) = mpsc::channel(1024);
        let (event_tx, event_rx) = mpsc::channel(1024);

        let handles = ActorHandles {
            link_rx,
            transport_rx,
            pipeline_rx,
            event_tx,
        };

        let manager = Self {
            link_tx,
            transport_tx,
            pipeline_tx,
            event_rx,
        };

        (manager, handles)
    }

    /// Send a UI command to the link actor
    pub fn send_command(&self, cmd: SensorCommand) -> Result<(), String> {
        self.link_tx
            .clone()
            .try_send(LinkMessage::Command(cmd))
            .map_err(|e| {
                if e.is_full() {
                    "System overloaded: Too many pending commands. Please slow down.".to_string()
                } else {
                    "System error: Sensor link unavailable.".to_string()
                }
            })
    }

    /// Get mutable reference to event receiver
    ///
    /// This allows the UI layer to poll for events from actors
    pub fn event_receiver(&mut self) -> &mut mpsc::Receiver<SensorEvent> {
        &mut self.event_rx
    }

    /// Take ownership of event receiver
    ///
    /// This allows the UI layer to move the receiver into a spawned task.
    /// The receiver should only be taken once; events sent after the take
    /// are delivered to the taken receiver, not the manager.
    pub fn take_event_receiver(&mut self) -> mpsc::Receiver<SensorEvent> {
        let (_new_tx, new_rx) = mpsc::channel(1);
        std::mem::replace(&mut self.event_rx, new_rx)
    }

    /// Clone senders for direct actor-to-actor communication
    ///
    /// These clones can be passed to actors for internal messaging
    pub fn link_sender(&self) -> mpsc::Sender<LinkMessage> {
        self.link_tx.clone()
    }

    pub fn transport_sender(&self) -> mpsc::Sender<TransportCommand> {
        self.transport_tx.clone()
    }

    pub fn pipeline_sender(&self) -> mpsc::Sender<PipelineMessage> {
        self.pipeline_tx.clone()
    }
}
