use csc_codec::CSC_MEASUREMENT_UUID;
use csc_protocol::DeviceHandle;
use futures_channel::mpsc;
use sensor_runtime::{link_debug, LinkMessage, PipelineMessage};
use std::time::Instant;
use uuid::Uuid;

/// The adapter a platform BLE transport calls into.
///
/// The transport executes [`TransportCommand`]s however its platform demands
/// (btleplug, a mobile binding, a simulator) and reports outcomes through
/// these methods. Callbacks arrive on transport threads, so everything here
/// is a cheap non-blocking channel send.
///
/// [`TransportCommand`]: sensor_runtime::TransportCommand
#[derive(Clone)]
pub struct TransportLink {
    link_tx: mpsc::Sender<LinkMessage>,
    pipeline_tx: mpsc::Sender<PipelineMessage>,
}

impl TransportLink {
    pub fn new(
        link_tx: mpsc::Sender<LinkMessage>,
        pipeline_tx: mpsc::Sender<PipelineMessage>,
    ) -> Self {
        Self {
            link_tx,
            pipeline_tx,
        }
    }

    /// An advertisement passed the service filter during a scan.
    pub fn on_device_matched(&self, device: DeviceHandle) {
        self.send_link(LinkMessage::DeviceMatched { device });
    }

    /// The transport-level connection is up; service discovery comes next.
    pub fn on_connected(&self) {
        self.send_link(LinkMessage::TransportConnected);
    }

    /// Service discovery finished and notifications are enabled.
    pub fn on_services_ready(&self) {
        self.send_link(LinkMessage::ServicesReady);
    }

    /// The connection dropped, for any reason.
    pub fn on_disconnected(&self) {
        self.send_link(LinkMessage::TransportDisconnected);
    }

    /// A characteristic notification arrived.
    ///
    /// Timestamped here, at receipt, so queueing in the pipeline never skews
    /// the estimator's wall-clock view. Notifications for characteristics
    /// other than CSC measurement are dropped.
    pub fn on_notify(&self, characteristic: Uuid, payload: Vec<u8>) {
        if characteristic != CSC_MEASUREMENT_UUID {
            link_debug!("Ignoring notification for {}", characteristic);
            return;
        }

        if self
            .pipeline_tx
            .clone()
            .try_send(PipelineMessage::Notification {
                payload,
                received_at: Instant::now(),
            })
            .is_err()
        {
            link_debug!("Notification dropped: pipeline unavailable");
        }
    }

    fn send_link(&self, msg: LinkMessage) {
        if let Err(e) = self.link_tx.clone().try_send(msg) {
            link_debug!("Transport event dropped: {:?}", e);
        }
    }
}
