//! Error Handling Guidelines
//!
//! All error messages should follow this format:
//!
//! 1. **What failed**: Describe the operation that failed
//! 2. **Why it failed**: Provide the root cause if known
//! 3. **What to do**: Suggest user action when possible

use thiserror::Error;

/// Unified error type for link and pipeline operations
#[derive(Error, Debug, Clone)]
pub enum LinkError {
    /// State transition was rejected
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Actor received an unexpected message in current state
    #[error("Unexpected message in state {state}: {message}")]
    UnexpectedMessage { state: String, message: String },

    /// Communication channel closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Timeout waiting for response
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Transport layer error (scan, GATT, connection)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Notification payload did not match the CSC measurement layout
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for LinkError {
    fn from(s: String) -> Self {
        LinkError::Other(s)
    }
}

impl From<&str> for LinkError {
    fn from(s: &str) -> Self {
        LinkError::Other(s.to_string())
    }
}
