//! CSC Measurement (0x2A5B) notification parsing.
//!
//! Layout is fixed by the Bluetooth SIG CSC profile and must be decoded
//! bit-exactly:
//! - Byte 0: flags (bit 0 = wheel fields present, bit 1 = crank fields present)
//! - Wheel fields, if present: u32 LE cumulative revolutions, u16 LE event time
//! - Crank fields, if present: u16 LE cumulative revolutions, u16 LE event time
//!
//! Event times are a hardware clock in 1/1024 s units wrapping modulo 65536.

use crate::{CRANK_REV_DATA_PRESENT, WHEEL_REV_DATA_PRESENT};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Notification carried no bytes at all
    #[error("empty payload: CSC measurement requires at least a flags byte")]
    Empty,

    /// Payload shorter than the fields its flags byte claims are present
    #[error("payload truncated: {field} needs {needed} bytes, {got} remain")]
    Truncated {
        field: &'static str,
        needed: usize,
        got: usize,
    },
}

/// Wheel revolution fields of a CSC measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelData {
    /// Cumulative wheel revolutions since sensor power-on
    pub revolutions: u32,
    /// Time of the last wheel event, 1/1024 s units, wraps modulo 65536
    pub event_time: u16,
}

/// Crank revolution fields of a CSC measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrankData {
    /// Cumulative crank revolutions since sensor power-on
    pub revolutions: u16,
    /// Time of the last crank event, 1/1024 s units, wraps modulo 65536
    pub event_time: u16,
}

/// A decoded CSC measurement notification.
///
/// Produced once per notification and consumed immediately; the decoder does
/// no semantic validation (counter plausibility is the estimator's job).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CscFrame {
    pub wheel: Option<WheelData>,
    pub crank: Option<CrankData>,
}

impl CscFrame {
    /// Decode a raw notification payload. Never panics: a payload shorter
    /// than its flags demand yields a [`FrameError`] and no partial frame.
    pub fn decode(data: &[u8]) -> Result<CscFrame, FrameError> {
        let (&flags, rest) = data.split_first().ok_or(FrameError::Empty)?;

        let mut frame = CscFrame::default();
        let mut offset = 0usize;

        if flags & WHEEL_REV_DATA_PRESENT != 0 {
            frame.wheel = Some(WheelData {
                revolutions: u32::from_le_bytes(take(rest, offset, "wheel revolution count")?),
                event_time: u16::from_le_bytes(take(rest, offset + 4, "wheel event time")?),
            });
            offset += 6;
        }

        if flags & CRANK_REV_DATA_PRESENT != 0 {
            frame.crank = Some(CrankData {
                revolutions: u16::from_le_bytes(take(rest, offset, "crank revolution count")?),
                event_time: u16::from_le_bytes(take(rest, offset + 2, "crank event time")?),
            });
        }

        Ok(frame)
    }

    /// Exact inverse of [`CscFrame::decode`]; used by tests and simulated
    /// sensors to produce wire-identical notifications.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.flags()];
        if let Some(wheel) = &self.wheel {
            out.extend_from_slice(&wheel.revolutions.to_le_bytes());
            out.extend_from_slice(&wheel.event_time.to_le_bytes());
        }
        if let Some(crank) = &self.crank {
            out.extend_from_slice(&crank.revolutions.to_le_bytes());
            out.extend_from_slice(&crank.event_time.to_le_bytes());
        }
        out
    }

    /// The flags byte this frame would carry on the wire
    pub fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.wheel.is_some() {
            flags |= WHEEL_REV_DATA_PRESENT;
        }
        if self.crank.is_some() {
            flags |= CRANK_REV_DATA_PRESENT;
        }
        flags
    }
}

/// Bounds-checked field read after the flags byte
fn take<const N: usize>(
    rest: &[u8],
    offset: usize,
    field: &'static str,
) -> Result<[u8; N], FrameError> {
    let truncated = FrameError::Truncated {
        field,
        needed: N,
        got: rest.len().saturating_sub(offset),
    };
    rest.get(offset..offset + N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(truncated)
}
