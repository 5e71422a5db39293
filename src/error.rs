//! Error handling for camera operations
//!
//! This module defines the error type shared by the session, the device
//! directory, and the reconnection supervisor, plus a Result alias used
//! throughout the crate.

use thiserror::Error;

/// Main error type for camera operations
///
/// Driver-level failures keep the vendor's numeric status code so it can be
/// quoted verbatim in support tickets; `NoData` on retrieval is not an error
/// at all and is reported as [`Grab::Empty`](crate::types::Grab) instead.
#[derive(Error, Debug)]
pub enum CamError {
    /// Operation requires an open session
    #[error("camera is not open")]
    NotOpen,

    /// Open was called on a session that already holds a device
    #[error("camera is already open")]
    AlreadyOpen,

    /// Frame retrieval requires an active acquisition
    #[error("camera is not grabbing")]
    NotGrabbing,

    /// Device index outside the enumerated range
    #[error("device index {index} out of range ({available} device(s) found)")]
    InvalidIndex { index: usize, available: usize },

    /// No enumerated device carries the requested serial number
    #[error("no device with serial number '{0}'")]
    SerialNotFound(String),

    /// A driver call returned a non-success status
    #[error("{op} failed with driver status 0x{code:08X}")]
    Driver { op: &'static str, code: u32 },

    /// The driver delivered fewer payload bytes than the frame geometry requires
    #[error("frame payload truncated: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// The reconnection supervisor ran out of attempts
    #[error("reconnect gave up after {attempts} attempt(s)")]
    ReconnectExhausted { attempts: u32 },
}

impl CamError {
    /// Build a driver failure for the named operation
    pub(crate) fn driver(op: &'static str, code: u32) -> Self {
        CamError::Driver { op, code }
    }

    /// True for wrong-session-state failures (not open, already open, not grabbing)
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CamError::NotOpen | CamError::AlreadyOpen | CamError::NotGrabbing
        )
    }

    /// True for caller-supplied-argument failures (bad index, unknown serial)
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            CamError::InvalidIndex { .. } | CamError::SerialNotFound(_)
        )
    }

    /// The vendor status code, when the failure came from the driver
    pub fn driver_status(&self) -> Option<u32> {
        match self {
            CamError::Driver { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for camera operations
pub type Result<T> = std::result::Result<T, CamError>;
