//! Driver capability surface
//!
//! This module defines the narrow interface the session consumes from a
//! vendor camera driver, enabling both real SDK adapters and the simulated
//! camera used for testing.
//!
//! # Architecture
//!
//! - [`CameraDriver`] - the capability trait: enumeration, handle lifecycle,
//!   generic feature get/set, acquisition control, frame fetch/release,
//!   pixel-format conversion
//! - [`features`] - the feature-name string keys passed to the generic
//!   get/set calls
//! - [`MockCamera`] - a scriptable simulated camera (feature `mock-camera`)
//!
//! Vendor SDKs report failures as numeric status codes rather than rich
//! errors; [`DriverError`] keeps that code verbatim so it survives into logs
//! and support tickets unchanged.

pub mod features;
#[cfg(feature = "mock-camera")]
pub mod mock;

#[cfg(feature = "mock-camera")]
pub use mock::MockCamera;

use crate::types::{FrameMeta, PixelFormat, TransportKind, TransportMask};
use std::time::Duration;

/// Device record as reported by the driver during enumeration
///
/// Network addresses arrive packed the way GigE Vision puts them on the
/// wire; decoding into display form is the device directory's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeviceInfo {
    /// Transport the device was found on
    pub transport: TransportKind,
    /// Manufacturer serial number
    pub serial: String,
    /// Model name
    pub model: String,
    /// IPv4 address in packed big-endian form; `None` for USB devices
    pub packed_ip: Option<u32>,
}

/// Opaque identifier for one device connection, minted by the driver
///
/// A handle is created before the device is opened and destroyed after it is
/// closed; the driver's internal table is authoritative for what state the
/// handle is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Wrap a raw driver identifier
    pub fn from_raw(raw: u64) -> Self {
        Handle(raw)
    }

    /// The raw driver identifier
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// A non-success status returned by a driver call
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("driver status 0x{code:08X}")]
pub struct DriverError {
    /// The vendor's numeric status code
    pub code: u32,
}

impl DriverError {
    /// Wrap a vendor status code
    pub fn new(code: u32) -> Self {
        Self { code }
    }
}

/// Well-known vendor status codes, used by driver implementations and tests
pub mod status {
    /// Invalid or stale handle
    pub const BAD_HANDLE: u32 = 0x8000_0000;
    /// Feature not supported by the device
    pub const NOT_SUPPORTED: u32 = 0x8000_0001;
    /// Destination buffer too small
    pub const BUFFER_TOO_SMALL: u32 = 0x8000_0002;
    /// Call out of sequence (e.g. fetch before start)
    pub const CALL_ORDER: u32 = 0x8000_0003;
    /// Parameter rejected by the device
    pub const BAD_PARAMETER: u32 = 0x8000_0004;
    /// Pixel conversion failed
    pub const CONVERT_FAILED: u32 = 0x8000_0005;
    /// Driver out of resources (frame pool exhausted)
    pub const NO_RESOURCE: u32 = 0x8000_0006;
    /// Link to the device lost
    pub const LINK_DOWN: u32 = 0x8000_0012;
}

/// Reply to an enum-feature query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    /// Currently selected entry, as its numeric code
    pub current: u32,
}

/// Reply to a float-feature query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatValue {
    /// Current value
    pub current: f64,
    /// Smallest accepted value
    pub min: f64,
    /// Largest accepted value
    pub max: f64,
}

/// Reply to an integer-feature query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntValue {
    /// Current value
    pub current: i64,
    /// Smallest accepted value
    pub min: i64,
    /// Largest accepted value
    pub max: i64,
}

/// Receipt for one fetched frame, returned to the driver on release
///
/// Deliberately neither `Copy` nor `Clone`: a pool slot can be released
/// exactly once, and the move makes a double release unrepresentable.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameToken(u64);

impl FrameToken {
    /// Mint a token for a pool slot (driver implementations only)
    pub fn new(slot: u64) -> Self {
        FrameToken(slot)
    }

    /// The pool slot this token stands for
    pub fn slot(&self) -> u64 {
        self.0
    }
}

/// One frame as delivered by the driver
#[derive(Debug)]
pub struct DriverFrame {
    /// Geometry and format of the payload
    pub meta: FrameMeta,
    /// The frame payload
    pub data: Vec<u8>,
    /// Receipt that must go back via [`CameraDriver::release_frame`]
    pub token: FrameToken,
}

/// Outcome of one fetch call
#[derive(Debug)]
pub enum Fetch {
    /// A frame was delivered; release its token when done
    Frame(DriverFrame),
    /// No frame became ready within the timeout - not a failure
    NoData,
}

/// Narrow interface onto a vendor camera driver
///
/// Implementations must be `Send` so a session can move to a dedicated
/// acquisition thread. All calls are synchronous; `fetch_frame` blocks up to
/// its timeout.
///
/// Every fetched frame occupies a driver pool slot until its token is passed
/// to [`release_frame`](CameraDriver::release_frame). Callers that fetch
/// without releasing will exhaust the pool.
#[cfg_attr(test, mockall::automock)]
pub trait CameraDriver: Send {
    /// List reachable devices on the selected transports
    fn enumerate(&mut self, transports: TransportMask) -> Result<Vec<RawDeviceInfo>, DriverError>;

    /// Create a handle bound to one enumerated device
    fn create_handle(&mut self, info: &RawDeviceInfo) -> Result<Handle, DriverError>;

    /// Destroy a handle, releasing its driver-side record
    fn destroy_handle(&mut self, handle: Handle);

    /// Open the device connection behind a handle
    fn open_device(&mut self, handle: Handle) -> Result<(), DriverError>;

    /// Close the device connection behind a handle
    fn close_device(&mut self, handle: Handle) -> Result<(), DriverError>;

    /// Set an enumerated feature by its numeric entry code
    fn set_enum(&mut self, handle: Handle, feature: &str, value: u32) -> Result<(), DriverError>;

    /// Set a floating-point feature
    fn set_float(&mut self, handle: Handle, feature: &str, value: f64) -> Result<(), DriverError>;

    /// Set an integer feature
    fn set_int(&mut self, handle: Handle, feature: &str, value: i64) -> Result<(), DriverError>;

    /// Query an enumerated feature
    fn get_enum(&mut self, handle: Handle, feature: &str) -> Result<EnumValue, DriverError>;

    /// Query a floating-point feature with its accepted range
    fn get_float(&mut self, handle: Handle, feature: &str) -> Result<FloatValue, DriverError>;

    /// Query an integer feature with its accepted range
    fn get_int(&mut self, handle: Handle, feature: &str) -> Result<IntValue, DriverError>;

    /// Execute a command feature (e.g. a software trigger)
    fn send_command(&mut self, handle: Handle, feature: &str) -> Result<(), DriverError>;

    /// Start streaming frames into the driver's pool
    fn start_grabbing(&mut self, handle: Handle) -> Result<(), DriverError>;

    /// Stop streaming
    fn stop_grabbing(&mut self, handle: Handle) -> Result<(), DriverError>;

    /// Block up to `timeout` for the next frame
    fn fetch_frame(&mut self, handle: Handle, timeout: Duration) -> Result<Fetch, DriverError>;

    /// Return a fetched frame's pool slot to the driver
    fn release_frame(&mut self, handle: Handle, token: FrameToken);

    /// Convert `src` into `dst_format`, writing into `dst`
    ///
    /// `dst.len()` is the destination capacity; returns the bytes written.
    fn convert_pixel_format(
        &mut self,
        handle: Handle,
        src: &[u8],
        src_meta: &FrameMeta,
        dst: &mut [u8],
        dst_format: PixelFormat,
    ) -> Result<usize, DriverError>;
}
