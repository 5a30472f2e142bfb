use crate::UpdatePublisher;
use csc_codec::{CscFrame, RevolutionCounter};
use csc_protocol::{CscUpdate, LinkError};
use sensor_runtime::{link_debug, Actor, PipelineMessage};

/// PipelineActor turns raw CSC notifications into published measurements
///
/// Responsibilities:
/// - Decode each notification payload into a frame
/// - Run the per-axis revolution estimators (wheel and crank)
/// - Carry forward the last value for axes a notification did not include
/// - Publish the merged snapshot after every accepted notification
///
/// Estimator state is per-session: the link actor sends Reset on disconnect
/// and stop, so counters from one sensor never seed rates for the next.
pub struct PipelineActor {
    wheel: RevolutionCounter,
    crank: RevolutionCounter,
    last: CscUpdate,
    publisher: UpdatePublisher,
}

impl PipelineActor {
    pub fn new(publisher: UpdatePublisher) -> Self {
        Self {
            wheel: RevolutionCounter::new(),
            crank: RevolutionCounter::new(),
            last: CscUpdate::default(),
            publisher,
        }
    }

    fn handle_notification(
        &mut self,
        payload: &[u8],
        received_at: std::time::Instant,
    ) -> Result<(), LinkError> {
        // A malformed payload is reported and dropped; the session continues
        let frame =
            CscFrame::decode(payload).map_err(|e| LinkError::MalformedFrame(e.to_string()))?;

        if let Some(wheel) = frame.wheel {
            let (count, rpm) = self.wheel.observe(wheel.revolutions, wheel.event_time, received_at);
            self.last.wheel_revolutions = count;
            self.last.wheel_rpm = rpm;
        }

        if let Some(crank) = frame.crank {
            let (count, rpm) = self.crank.observe(
                u32::from(crank.revolutions),
                crank.event_time,
                received_at,
            );
            self.last.crank_revolutions = count;
            self.last.crank_rpm = rpm;
        }

        self.publisher.publish_update(self.last);
        Ok(())
    }

    fn handle_reset(&mut self) {
        link_debug!("PipelineActor: discarding session state");
        self.wheel = RevolutionCounter::new();
        self.crank = RevolutionCounter::new();
        self.last = CscUpdate::default();
    }
}

impl Actor for PipelineActor {
    type Message = PipelineMessage;

    fn name(&self) -> &'static str {
        "PipelineActor"
    }

    async fn handle(&mut self, msg: PipelineMessage) -> Result<(), LinkError> {
        match msg {
            PipelineMessage::Notification {
                payload,
                received_at,
            } => self.handle_notification(&payload, received_at),
            PipelineMessage::Reset => {
                self.handle_reset();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use csc_codec::frame::{CrankData, WheelData};
    use std::time::{Duration, Instant};

    fn wheel_payload(revolutions: u32, event_time: u16) -> Vec<u8> {
        CscFrame {
            wheel: Some(WheelData {
                revolutions,
                event_time,
            }),
            crank: None,
        }
        .encode()
    }

    fn crank_payload(revolutions: u16, event_time: u16) -> Vec<u8> {
        CscFrame {
            wheel: None,
            crank: Some(CrankData {
                revolutions,
                event_time,
            }),
        }
        .encode()
    }

    #[tokio::test]
    async fn test_wheel_notification_publishes_update() {
        let publisher = UpdatePublisher::new();
        let rx = publisher.subscribe_updates();
        let mut actor = PipelineActor::new(publisher);

        let t0 = Instant::now();
        actor
            .handle(PipelineMessage::Notification {
                payload: wheel_payload(1000, 0),
                received_at: t0,
            })
            .await
            .unwrap();
        actor
            .handle(PipelineMessage::Notification {
                payload: wheel_payload(1001, 512),
                received_at: t0 + Duration::from_millis(500),
            })
            .await
            .unwrap();

        let update = rx.borrow().unwrap();
        assert_eq!(update.wheel_revolutions, 1001);
        assert!((update.wheel_rpm - 120.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_crank_only_notification_keeps_wheel_values() {
        let publisher = UpdatePublisher::new();
        let rx = publisher.subscribe_updates();
        let mut actor = PipelineActor::new(publisher);

        let t0 = Instant::now();
        actor
            .handle(PipelineMessage::Notification {
                payload: wheel_payload(1000, 0),
                received_at: t0,
            })
            .await
            .unwrap();
        actor
            .handle(PipelineMessage::Notification {
                payload: crank_payload(50, 1024),
                received_at: t0 + Duration::from_secs(1),
            })
            .await
            .unwrap();

        // Wheel axis carried forward from the earlier notification
        let update = rx.borrow().unwrap();
        assert_eq!(update.wheel_revolutions, 1000);
        assert_eq!(update.crank_revolutions, 50);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_an_error_and_publishes_nothing() {
        let publisher = UpdatePublisher::new();
        let rx = publisher.subscribe_updates();
        let mut actor = PipelineActor::new(publisher);

        let result = actor
            .handle(PipelineMessage::Notification {
                payload: vec![0x01, 0xE8], // wheel flagged, body truncated
                received_at: Instant::now(),
            })
            .await;

        assert!(matches!(result, Err(LinkError::MalformedFrame(_))));
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_does_not_corrupt_session() {
        let publisher = UpdatePublisher::new();
        let rx = publisher.subscribe_updates();
        let mut actor = PipelineActor::new(publisher);

        let t0 = Instant::now();
        actor
            .handle(PipelineMessage::Notification {
                payload: wheel_payload(1000, 0),
                received_at: t0,
            })
            .await
            .unwrap();
        let _ = actor
            .handle(PipelineMessage::Notification {
                payload: vec![0x03],
                received_at: t0 + Duration::from_millis(100),
            })
            .await;
        actor
            .handle(PipelineMessage::Notification {
                payload: wheel_payload(1001, 512),
                received_at: t0 + Duration::from_millis(500),
            })
            .await
            .unwrap();

        let update = rx.borrow().unwrap();
        assert!((update.wheel_rpm - 120.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_reset_discards_estimator_state() {
        let publisher = UpdatePublisher::new();
        let rx = publisher.subscribe_updates();
        let mut actor = PipelineActor::new(publisher);

        let t0 = Instant::now();
        actor
            .handle(PipelineMessage::Notification {
                payload: wheel_payload(5000, 0),
                received_at: t0,
            })
            .await
            .unwrap();

        actor.handle(PipelineMessage::Reset).await.unwrap();

        // A new sensor with much lower counters is a fresh first sample,
        // not a regression against the previous session
        actor
            .handle(PipelineMessage::Notification {
                payload: wheel_payload(10, 0),
                received_at: t0 + Duration::from_secs(5),
            })
            .await
            .unwrap();

        let update = rx.borrow().unwrap();
        assert_eq!(update.wheel_revolutions, 10);
        assert_eq!(update.wheel_rpm, 0.0);
    }
}
