//! Revolution-rate estimation from cumulative CSC counters.
//!
//! Sensors report `(cumulative revolutions, event time)` pairs where the event
//! time is a 16-bit 1/1024 s clock that wraps every 64 seconds. The estimator
//! turns those into an instantaneous RPM while defending against counter
//! replays, duplicate timestamps, and the low-cadence case where notifications
//! arrive faster than revolutions complete.

use std::time::Instant;

/// Wrap-aware delta on the 16-bit event-time ring, in 1/1024 s ticks.
///
/// The wraparound direction is always "forward in time": when `new < old` the
/// clock is assumed to have wrapped once, never to have run backwards.
pub fn wrap_diff(new: u16, old: u16) -> u32 {
    let wrap = if new < old { 65_536 } else { 0 };
    u32::from(new) + wrap - u32::from(old)
}

/// Per-axis revolution counter state. One instance each for wheel and crank,
/// owned by the decode pipeline, created fresh per connection session and
/// discarded on disconnect.
#[derive(Debug, Clone, Default)]
pub struct RevolutionCounter {
    last_count: u32,
    last_event_time: u16,
    last_rpm: f32,
    last_real_time: Option<Instant>,
}

impl RevolutionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one `(count, event_time)` sample observed at wall-clock `now`.
    /// Returns the accepted cumulative count and the estimated RPM.
    ///
    /// Spurious inputs never corrupt state: a regressed count is dropped
    /// outright, and a duplicate event time with a count advance reports
    /// 0 RPM instead of dividing by zero.
    ///
    /// A sample repeating the previous count holds the prior rate for up to
    /// two revolution periods, so low-cadence riding does not flicker to zero
    /// between revolutions. The estimator never expires a value on a timer,
    /// only on receipt of a new sample; zeroing the display after prolonged
    /// silence is the consumer's staleness policy.
    pub fn observe(&mut self, count: u32, event_time: u16, now: Instant) -> (u32, f32) {
        // Revolution counters only increase (or reset to zero on power-cycle);
        // a lower value is a replayed or corrupt sample.
        if count < self.last_count {
            return (self.last_count, self.last_rpm);
        }

        // First sample of the session: nothing to compute a rate against.
        if self.last_count == 0 {
            self.last_count = count;
            self.last_event_time = event_time;
            self.last_rpm = 0.0;
            self.last_real_time = Some(now);
            return (count, 0.0);
        }

        if count == self.last_count {
            let elapsed = self
                .last_real_time
                .map_or(f32::INFINITY, |t| now.duration_since(t).as_secs_f32());
            if self.last_rpm > 0.0 && elapsed < 2.0 * (60.0 / self.last_rpm) {
                // No new revolution yet, but less than two periods have
                // passed at the previous rate: the rider has plausibly not
                // slowed. Hold the estimate.
                self.last_event_time = event_time;
                return (count, self.last_rpm);
            }
            // Past the window the zero-revolution delta below decays the
            // rate on its own; no explicit reset.
        }

        let dt_ticks = wrap_diff(event_time, self.last_event_time);
        let rpm = if dt_ticks == 0 {
            // Two distinct counts at the identical tick is a transport or
            // clock anomaly; report no motion rather than divide by zero.
            0.0
        } else {
            (count - self.last_count) as f32 / dt_ticks as f32 * 1024.0 * 60.0
        };

        self.last_count = count;
        self.last_event_time = event_time;
        self.last_rpm = rpm;
        self.last_real_time = Some(now);
        (count, rpm)
    }
}
