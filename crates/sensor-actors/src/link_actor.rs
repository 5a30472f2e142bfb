use crate::UpdatePublisher;
use csc_codec::CSC_SERVICE_UUID;
use csc_protocol::{DeviceHandle, LinkError, LinkState, SensorCommand, SensorEvent};
use futures_channel::mpsc;
use sensor_runtime::{
    link_debug, link_info, spawn_timeout, Actor, LinkMessage, PipelineMessage, SupervisionConfig,
    TimeoutHandle, TransportCommand,
};

/// LinkActor manages the connection state machine and coordinates the
/// transport and the decode pipeline
///
/// Responsibilities:
/// - Maintain single source of truth for link state
/// - Validate and execute state transitions
/// - Drive the transport (scan, connect, disconnect)
/// - Publish status snapshots and emit ordered status events
/// - Rescan automatically whenever a live connection drops
///
/// ## State Machine
///
/// For the complete state transition diagram and invariants, see:
/// `csc-protocol/src/state.rs` - LinkState documentation
///
/// Key coordination patterns:
/// - **Match-then-connect**: Scanning → DeviceFound stops the scan and
///   immediately requests a connection to the matched device
/// - **Automatic rescan**: Ready → Disconnected → Scanning without user input
/// - **Cached reconnect**: Connect with a cached handle skips discovery
pub struct LinkActor {
    state: LinkState,
    transport_tx: mpsc::Sender<TransportCommand>,
    pipeline_tx: mpsc::Sender<PipelineMessage>,
    event_tx: mpsc::Sender<SensorEvent>,

    // Channel to send messages to self (for timeouts)
    link_tx: mpsc::Sender<LinkMessage>,

    publisher: UpdatePublisher,

    // Supervision configuration
    supervision_config: SupervisionConfig,

    // Active timeout handle - automatically cancelled on every transition
    active_timeout: Option<TimeoutHandle>,

    // Last device that matched the scan filter; enables the cached
    // reconnect short-circuit
    device: Option<DeviceHandle>,
}

impl LinkActor {
    pub fn new(
        transport_tx: mpsc::Sender<TransportCommand>,
        pipeline_tx: mpsc::Sender<PipelineMessage>,
        event_tx: mpsc::Sender<SensorEvent>,
        link_tx: mpsc::Sender<LinkMessage>,
        publisher: UpdatePublisher,
    ) -> Self {
        Self {
            state: LinkState::Idle,
            transport_tx,
            pipeline_tx,
            event_tx,
            link_tx,
            publisher,
            supervision_config: SupervisionConfig::default(),
            active_timeout: None,
            device: None,
        }
    }

    /// Send a CRITICAL message that must succeed for system correctness
    ///
    /// If the channel is closed, the transport has shut down.
    /// If the channel is full, the system is overloaded.
    /// Both cases propagate as errors.
    fn send_critical_transport(&self, msg: TransportCommand) -> Result<(), LinkError> {
        self.transport_tx.clone().try_send(msg).map_err(|e| {
            if e.is_disconnected() {
                LinkError::ChannelClosed("Transport has shut down".into())
            } else {
                LinkError::Other("Transport channel overloaded".into())
            }
        })
    }

    fn send_critical_pipeline(&self, msg: PipelineMessage) -> Result<(), LinkError> {
        self.pipeline_tx.clone().try_send(msg).map_err(|e| {
            if e.is_disconnected() {
                LinkError::ChannelClosed("PipelineActor has shut down".into())
            } else {
                LinkError::Other("PipelineActor channel overloaded".into())
            }
        })
    }

    /// Send a non-critical UI event
    ///
    /// Failures are logged but don't propagate
    fn send_ui_event(&self, event: SensorEvent) {
        if let Err(e) = self.event_tx.clone().try_send(event) {
            link_debug!("UI event dropped: {:?}", e);
        }
    }

    /// Attempt to transition to a new state
    ///
    /// Returns Ok if transition is valid, Err otherwise. On success the new
    /// status snapshot is published and an ordered StatusChanged event is
    /// emitted.
    fn transition(&mut self, new_state: LinkState) -> Result<(), LinkError> {
        if !self.state.can_transition_to(new_state) {
            return Err(LinkError::InvalidTransition(format!(
                "{:?} → {:?}",
                self.state, new_state
            )));
        }

        #[cfg(debug_assertions)]
        let old_state = self.state;

        // Cancel any active timeout from previous state
        if let Some(handle) = self.active_timeout.take() {
            handle.cancel();
        }

        self.state = new_state;

        // Ordered event first, coalescing watch second: anyone woken by the
        // watch can rely on the event already being queued
        let status = new_state.status();
        self.send_ui_event(SensorEvent::StatusChanged { status });
        self.publisher.publish_status(status);

        link_debug!("State: {:?} → {:?}", old_state, new_state);

        // Spawn supervision timeout for states that can stall
        self.active_timeout = self.spawn_supervision_timeout_if_needed(new_state);

        Ok(())
    }

    /// Spawn a supervision timeout for states that might hang
    ///
    /// Returns a TimeoutHandle stored in `active_timeout` and automatically
    /// cancelled when the state transitions. This prevents spurious timeout
    /// messages after the handshake completes.
    fn spawn_supervision_timeout_if_needed(&self, state: LinkState) -> Option<TimeoutHandle> {
        let (operation, timeout_secs) = match state {
            LinkState::DeviceFound => {
                ("DeviceFound", self.supervision_config.connect_timeout_secs)
            }
            LinkState::Connecting => {
                ("Connecting", self.supervision_config.connect_timeout_secs)
            }
            // Idle and Ready are stable; Scanning is open-ended by policy;
            // Disconnected is transient and leaves within the same handler
            _ => return None,
        };

        link_debug!("Spawning {} second timeout for {}", timeout_secs, operation);
        let handle = spawn_timeout(self.link_tx.clone(), operation, state, timeout_secs);
        Some(handle)
    }

    fn handle_start_scan(&mut self) -> Result<(), LinkError> {
        self.transition(LinkState::Scanning)?;
        self.publisher.resume_updates();
        self.send_critical_transport(TransportCommand::StartScan {
            service: CSC_SERVICE_UUID,
        })?;
        Ok(())
    }

    fn handle_connect(&mut self) -> Result<(), LinkError> {
        if let Some(device) = self.device.clone() {
            // Cached handle: skip discovery and connect directly
            self.transition(LinkState::Connecting)?;
            self.publisher.resume_updates();
            self.send_ui_event(SensorEvent::StatusUpdate {
                message: format!("Reconnecting to {}", device.address),
            });
            self.send_critical_transport(TransportCommand::Connect { device })?;
        } else {
            link_debug!("LinkActor: no cached device, falling back to scan");
            self.handle_start_scan()?;
        }
        Ok(())
    }

    fn handle_stop(&mut self) -> Result<(), LinkError> {
        // Release whatever the transport holds for the current state
        match self.state {
            LinkState::Scanning => self.send_critical_transport(TransportCommand::StopScan)?,
            LinkState::DeviceFound | LinkState::Connecting | LinkState::Ready => {
                self.send_critical_transport(TransportCommand::Disconnect)?
            }
            LinkState::Idle | LinkState::Disconnected => {}
        }

        // Gate measurements off before the Idle status becomes visible, so
        // nothing published after a stop ever surfaces. The device cache
        // survives so Connect can still short-circuit.
        self.publisher.pause_updates();
        self.transition(LinkState::Idle)?;
        self.send_critical_pipeline(PipelineMessage::Reset)?;

        Ok(())
    }

    fn handle_device_matched(&mut self, device: DeviceHandle) -> Result<(), LinkError> {
        // Advertisements can keep arriving after the stop request; only the
        // first match in Scanning wins
        if self.state != LinkState::Scanning {
            link_debug!("Ignoring DeviceMatched in {:?} state", self.state);
            return Ok(());
        }

        self.send_critical_transport(TransportCommand::StopScan)?;

        if let Some(ref name) = device.name {
            self.send_ui_event(SensorEvent::StatusUpdate {
                message: format!("Found {}", name),
            });
        }

        self.device = Some(device.clone());
        self.transition(LinkState::DeviceFound)?;
        self.send_critical_transport(TransportCommand::Connect { device })?;

        Ok(())
    }

    fn handle_transport_connected(&mut self) -> Result<(), LinkError> {
        // Valid from DeviceFound (scan flow) and Connecting (cached
        // reconnect, where the transport event is the confirmation)
        if self.state != LinkState::DeviceFound && self.state != LinkState::Connecting {
            return Err(LinkError::UnexpectedMessage {
                state: format!("{:?}", self.state),
                message: "TransportConnected".into(),
            });
        }

        self.transition(LinkState::Connecting)?;
        Ok(())
    }

    fn handle_services_ready(&mut self) -> Result<(), LinkError> {
        if self.state != LinkState::Connecting {
            return Err(LinkError::UnexpectedMessage {
                state: format!("{:?}", self.state),
                message: "ServicesReady".into(),
            });
        }

        self.transition(LinkState::Ready)?;

        let name = self
            .device
            .as_ref()
            .and_then(|d| d.name.clone())
            .unwrap_or_else(|| "sensor".to_string());
        self.send_ui_event(SensorEvent::StatusUpdate {
            message: format!("Connected to {}", name),
        });

        Ok(())
    }

    fn handle_transport_disconnected(&mut self) -> Result<(), LinkError> {
        // After a stop the transport still reports the teardown; nothing to do
        if self.state == LinkState::Idle || self.state == LinkState::Disconnected {
            link_debug!("Ignoring TransportDisconnected in {:?} state", self.state);
            return Ok(());
        }

        link_info!("LinkActor: connection lost, rescanning");

        self.device = None;
        self.transition(LinkState::Disconnected)?;
        self.send_critical_pipeline(PipelineMessage::Reset)?;

        // Continuous reconnection: immediately scan again
        self.transition(LinkState::Scanning)?;
        self.send_critical_transport(TransportCommand::StartScan {
            service: CSC_SERVICE_UUID,
        })?;

        Ok(())
    }

    fn handle_operation_timeout(
        &mut self,
        operation: String,
        expected_state: LinkState,
    ) -> Result<(), LinkError> {
        // Only handle timeout if we're still in the expected state
        // (if state has changed, the operation already completed)
        if self.state != expected_state {
            link_debug!(
                "Ignoring {} timeout - already transitioned to {:?}",
                operation,
                self.state
            );
            return Ok(());
        }

        link_info!("Operation timeout: {} in state {:?}", operation, self.state);

        self.send_ui_event(SensorEvent::Error {
            message: format!("{} timed out, scanning again", operation),
        });

        // Abandon the stuck handshake and go back to discovery
        self.send_critical_transport(TransportCommand::Disconnect)?;
        self.device = None;
        self.transition(LinkState::Disconnected)?;
        self.send_critical_pipeline(PipelineMessage::Reset)?;

        self.transition(LinkState::Scanning)?;
        self.send_critical_transport(TransportCommand::StartScan {
            service: CSC_SERVICE_UUID,
        })?;

        Ok(())
    }
}

impl Actor for LinkActor {
    type Message = LinkMessage;

    fn name(&self) -> &'static str {
        "LinkActor"
    }

    async fn handle(&mut self, msg: LinkMessage) -> Result<(), LinkError> {
        match msg {
            LinkMessage::Command(cmd) => match cmd {
                SensorCommand::StartScan => self.handle_start_scan()?,
                SensorCommand::Connect => self.handle_connect()?,
                SensorCommand::Stop => self.handle_stop()?,
            },
            LinkMessage::DeviceMatched { device } => self.handle_device_matched(device)?,
            LinkMessage::TransportConnected => self.handle_transport_connected()?,
            LinkMessage::ServicesReady => self.handle_services_ready()?,
            LinkMessage::TransportDisconnected => self.handle_transport_disconnected()?,
            LinkMessage::OperationTimeout { operation, state } => {
                self.handle_operation_timeout(operation, state)?
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use csc_protocol::{ConnectionStatus, CscUpdate};
    use futures::stream::StreamExt;

    fn create_test_actor() -> (
        LinkActor,
        mpsc::Receiver<TransportCommand>,
        mpsc::Receiver<PipelineMessage>,
        mpsc::Receiver<SensorEvent>,
        UpdatePublisher,
    ) {
        let (transport_tx, transport_rx) = mpsc::channel(100);
        let (pipeline_tx, pipeline_rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);
        let (link_tx, _link_rx) = mpsc::channel(100);
        let publisher = UpdatePublisher::new();

        let actor = LinkActor::new(
            transport_tx,
            pipeline_tx,
            event_tx,
            link_tx,
            publisher.clone(),
        );
        (actor, transport_rx, pipeline_rx, event_rx, publisher)
    }

    fn test_device() -> DeviceHandle {
        DeviceHandle::new("AA:BB:CC:DD:EE:FF".into(), Some("CSC-Sensor".into()))
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (actor, _, _, _, _) = create_test_actor();
        assert_eq!(actor.state, LinkState::Idle);
    }

    #[tokio::test]
    async fn test_start_scan() {
        let (mut actor, mut transport_rx, _, mut event_rx, _) = create_test_actor();

        actor
            .handle(LinkMessage::Command(SensorCommand::StartScan))
            .await
            .unwrap();

        assert_eq!(actor.state, LinkState::Scanning);

        // Should request a service-filtered scan
        let msg = transport_rx.next().await.unwrap();
        match msg {
            TransportCommand::StartScan { service } => {
                assert_eq!(service, CSC_SERVICE_UUID);
            }
            _ => panic!("Wrong message"),
        }

        // Should emit a searching status snapshot
        let event = event_rx.next().await.unwrap();
        match event {
            SensorEvent::StatusChanged { status } => {
                assert!(status.searching);
                assert!(!status.found);
                assert!(!status.connected);
            }
            _ => panic!("Wrong event"),
        }
    }

    #[tokio::test]
    async fn test_device_matched_stops_scan_and_connects() {
        let (mut actor, mut transport_rx, _, _, _) = create_test_actor();

        actor.state = LinkState::Scanning;
        actor
            .handle(LinkMessage::DeviceMatched {
                device: test_device(),
            })
            .await
            .unwrap();

        assert_eq!(actor.state, LinkState::DeviceFound);
        assert_eq!(actor.device, Some(test_device()));

        // StopScan first, then Connect to the matched device
        assert!(matches!(
            transport_rx.next().await.unwrap(),
            TransportCommand::StopScan
        ));
        match transport_rx.next().await.unwrap() {
            TransportCommand::Connect { device } => {
                assert_eq!(device.address, "AA:BB:CC:DD:EE:FF");
            }
            _ => panic!("Wrong message"),
        }
    }

    #[tokio::test]
    async fn test_device_matched_ignored_outside_scanning() {
        let (mut actor, mut transport_rx, _, _, _) = create_test_actor();

        actor.state = LinkState::Ready;
        actor
            .handle(LinkMessage::DeviceMatched {
                device: test_device(),
            })
            .await
            .unwrap();

        // No state change, no transport traffic
        assert_eq!(actor.state, LinkState::Ready);
        assert!(transport_rx.try_next().is_err());
    }

    #[tokio::test]
    async fn test_handshake_to_ready() {
        let (mut actor, _, _, _, publisher) = create_test_actor();

        actor.state = LinkState::DeviceFound;
        actor.device = Some(test_device());

        actor.handle(LinkMessage::TransportConnected).await.unwrap();
        assert_eq!(actor.state, LinkState::Connecting);

        actor.handle(LinkMessage::ServicesReady).await.unwrap();
        assert_eq!(actor.state, LinkState::Ready);

        // Subscribers see the connected snapshot
        let status = publisher.subscribe_status();
        assert_eq!(
            *status.borrow(),
            ConnectionStatus {
                searching: false,
                found: false,
                connected: true
            }
        );
    }

    #[tokio::test]
    async fn test_services_ready_rejected_outside_connecting() {
        let (mut actor, _, _, _, _) = create_test_actor();

        actor.state = LinkState::Scanning;
        let result = actor.handle_services_ready();
        assert!(matches!(result, Err(LinkError::UnexpectedMessage { .. })));
        assert_eq!(actor.state, LinkState::Scanning);
    }

    #[tokio::test]
    async fn test_disconnect_triggers_rescan_with_ordered_snapshots() {
        let (mut actor, mut transport_rx, mut pipeline_rx, mut event_rx, _) = create_test_actor();

        actor.state = LinkState::Ready;
        actor.device = Some(test_device());

        actor
            .handle(LinkMessage::TransportDisconnected)
            .await
            .unwrap();

        assert_eq!(actor.state, LinkState::Scanning);
        assert_eq!(actor.device, None);

        // Exactly two snapshots, in order: all-false, then searching
        match event_rx.next().await.unwrap() {
            SensorEvent::StatusChanged { status } => {
                assert_eq!(status, ConnectionStatus::default());
            }
            _ => panic!("Wrong event"),
        }
        match event_rx.next().await.unwrap() {
            SensorEvent::StatusChanged { status } => {
                assert!(status.searching);
            }
            _ => panic!("Wrong event"),
        }

        // Session state discarded, then a fresh scan requested
        assert!(matches!(
            pipeline_rx.next().await.unwrap(),
            PipelineMessage::Reset
        ));
        assert!(matches!(
            transport_rx.next().await.unwrap(),
            TransportCommand::StartScan { .. }
        ));
    }

    #[tokio::test]
    async fn test_stop_mid_scan() {
        let (mut actor, mut transport_rx, mut pipeline_rx, _, publisher) = create_test_actor();

        actor
            .handle(LinkMessage::Command(SensorCommand::StartScan))
            .await
            .unwrap();
        // Drain the StartScan command
        assert!(matches!(
            transport_rx.next().await.unwrap(),
            TransportCommand::StartScan { .. }
        ));

        actor
            .handle(LinkMessage::Command(SensorCommand::Stop))
            .await
            .unwrap();

        assert_eq!(actor.state, LinkState::Idle);
        assert!(matches!(
            transport_rx.next().await.unwrap(),
            TransportCommand::StopScan
        ));
        assert!(matches!(
            pipeline_rx.next().await.unwrap(),
            PipelineMessage::Reset
        ));

        // Updates are gated off after a stop
        let rx = publisher.subscribe_updates();
        publisher.publish_update(CscUpdate::default());
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_stop_while_ready_disconnects() {
        let (mut actor, mut transport_rx, _pipeline_rx, _, _) = create_test_actor();

        actor.state = LinkState::Ready;
        actor.device = Some(test_device());

        actor
            .handle(LinkMessage::Command(SensorCommand::Stop))
            .await
            .unwrap();

        assert_eq!(actor.state, LinkState::Idle);
        assert!(matches!(
            transport_rx.next().await.unwrap(),
            TransportCommand::Disconnect
        ));

        // Device cache survives stop for the reconnect short-circuit
        assert_eq!(actor.device, Some(test_device()));
    }

    #[tokio::test]
    async fn test_connect_with_cached_device_skips_scan() {
        let (mut actor, mut transport_rx, _, _, _) = create_test_actor();

        actor.device = Some(test_device());
        actor
            .handle(LinkMessage::Command(SensorCommand::Connect))
            .await
            .unwrap();

        assert_eq!(actor.state, LinkState::Connecting);
        match transport_rx.next().await.unwrap() {
            TransportCommand::Connect { device } => {
                assert_eq!(device, test_device());
            }
            _ => panic!("Expected a direct connect, not a scan"),
        }
    }

    #[tokio::test]
    async fn test_connect_without_cache_falls_back_to_scan() {
        let (mut actor, mut transport_rx, _, _, _) = create_test_actor();

        actor
            .handle(LinkMessage::Command(SensorCommand::Connect))
            .await
            .unwrap();

        assert_eq!(actor.state, LinkState::Scanning);
        assert!(matches!(
            transport_rx.next().await.unwrap(),
            TransportCommand::StartScan { .. }
        ));
    }

    #[tokio::test]
    async fn test_stale_timeout_ignored() {
        let (mut actor, mut transport_rx, _, _, _) = create_test_actor();

        // Handshake completed before the timeout message was processed
        actor.state = LinkState::Ready;
        actor
            .handle(LinkMessage::OperationTimeout {
                operation: "Connecting".into(),
                state: LinkState::Connecting,
            })
            .await
            .unwrap();

        assert_eq!(actor.state, LinkState::Ready);
        assert!(transport_rx.try_next().is_err());
    }

    #[tokio::test]
    async fn test_timeout_in_connecting_rescans() {
        let (mut actor, mut transport_rx, mut pipeline_rx, mut event_rx, _) = create_test_actor();

        actor.state = LinkState::Connecting;
        actor.device = Some(test_device());

        actor
            .handle(LinkMessage::OperationTimeout {
                operation: "Connecting".into(),
                state: LinkState::Connecting,
            })
            .await
            .unwrap();

        assert_eq!(actor.state, LinkState::Scanning);
        assert_eq!(actor.device, None);

        assert!(matches!(
            transport_rx.next().await.unwrap(),
            TransportCommand::Disconnect
        ));
        assert!(matches!(
            pipeline_rx.next().await.unwrap(),
            PipelineMessage::Reset
        ));
        assert!(matches!(
            transport_rx.next().await.unwrap(),
            TransportCommand::StartScan { .. }
        ));

        // The timeout is surfaced to the UI
        let event = event_rx.next().await.unwrap();
        assert!(matches!(event, SensorEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_invalid_command_reports_error() {
        let (mut actor, _, _, _, _) = create_test_actor();

        actor.state = LinkState::Ready;
        let result = actor
            .handle(LinkMessage::Command(SensorCommand::StartScan))
            .await;

        assert!(matches!(result, Err(LinkError::InvalidTransition(_))));
        assert_eq!(actor.state, LinkState::Ready);
    }
}
