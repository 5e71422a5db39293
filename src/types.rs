//! Core data types for camera acquisition
//!
//! This module contains the fundamental data structures used throughout
//! the crate for describing devices, frames, and retrieval outcomes.
//!
//! # Main Types
//!
//! - [`PixelFormat`] - Pixel format tags with their GigE Vision (GVSP) codes
//! - [`TransportKind`] / [`TransportMask`] - Device transport selection
//! - [`FrameMeta`] - Geometry and format of one delivered frame
//! - [`FrameView`] - A borrowed view of one retrieved frame
//! - [`Grab`] - Retrieval outcome: a frame, or "nothing ready yet"
//! - [`CancelToken`] - Cooperative cancellation for acquisition loops
//!
//! # Pixel Formats
//!
//! Formats are identified by their GVSP numeric codes so they can round-trip
//! through the driver's generic enum get/set calls unchanged. Codes the crate
//! does not know by name are preserved as [`PixelFormat::Unknown`] rather
//! than rejected - the driver is authoritative for what a device supports.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pixel format of a frame, carrying the GigE Vision streaming-protocol code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit monochrome
    Mono8,
    /// 12-bit monochrome in a 16-bit container
    Mono12,
    /// 8-bit Bayer, GR filter alignment
    BayerGR8,
    /// 8-bit Bayer, RG filter alignment
    BayerRG8,
    /// 8-bit Bayer, GB filter alignment
    BayerGB8,
    /// 8-bit Bayer, BG filter alignment
    BayerBG8,
    /// 24-bit packed RGB
    Rgb8,
    /// 24-bit packed BGR
    Bgr8,
    /// YUV 4:2:2 packed
    Yuv422_8,
    /// Any code this crate has no name for (kept verbatim)
    Unknown(u32),
}

impl PixelFormat {
    /// The GVSP numeric code for this format
    pub fn code(&self) -> u32 {
        match self {
            PixelFormat::Mono8 => 0x0108_0001,
            PixelFormat::Mono12 => 0x0110_0005,
            PixelFormat::BayerGR8 => 0x0108_0008,
            PixelFormat::BayerRG8 => 0x0108_0009,
            PixelFormat::BayerGB8 => 0x0108_000A,
            PixelFormat::BayerBG8 => 0x0108_000B,
            PixelFormat::Rgb8 => 0x0218_0014,
            PixelFormat::Bgr8 => 0x0218_0015,
            PixelFormat::Yuv422_8 => 0x0210_0032,
            PixelFormat::Unknown(code) => *code,
        }
    }

    /// Look up a format by its GVSP code
    pub fn from_code(code: u32) -> Self {
        match code {
            0x0108_0001 => PixelFormat::Mono8,
            0x0110_0005 => PixelFormat::Mono12,
            0x0108_0008 => PixelFormat::BayerGR8,
            0x0108_0009 => PixelFormat::BayerRG8,
            0x0108_000A => PixelFormat::BayerGB8,
            0x0108_000B => PixelFormat::BayerBG8,
            0x0218_0014 => PixelFormat::Rgb8,
            0x0218_0015 => PixelFormat::Bgr8,
            0x0210_0032 => PixelFormat::Yuv422_8,
            other => PixelFormat::Unknown(other),
        }
    }

    /// Bytes per pixel, when the format has a fixed known depth
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            PixelFormat::Mono8
            | PixelFormat::BayerGR8
            | PixelFormat::BayerRG8
            | PixelFormat::BayerGB8
            | PixelFormat::BayerBG8 => Some(1),
            PixelFormat::Mono12 | PixelFormat::Yuv422_8 => Some(2),
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => Some(3),
            PixelFormat::Unknown(_) => None,
        }
    }

    /// True for Bayer-mosaic formats that need demosaicing to become color
    pub fn is_bayer(&self) -> bool {
        matches!(
            self,
            PixelFormat::BayerGR8
                | PixelFormat::BayerRG8
                | PixelFormat::BayerGB8
                | PixelFormat::BayerBG8
        )
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Mono8 => write!(f, "Mono8"),
            PixelFormat::Mono12 => write!(f, "Mono12"),
            PixelFormat::BayerGR8 => write!(f, "BayerGR8"),
            PixelFormat::BayerRG8 => write!(f, "BayerRG8"),
            PixelFormat::BayerGB8 => write!(f, "BayerGB8"),
            PixelFormat::BayerBG8 => write!(f, "BayerBG8"),
            PixelFormat::Rgb8 => write!(f, "RGB8"),
            PixelFormat::Bgr8 => write!(f, "BGR8"),
            PixelFormat::Yuv422_8 => write!(f, "YUV422_8"),
            PixelFormat::Unknown(code) => write!(f, "Unknown(0x{:08X})", code),
        }
    }
}

/// Transport a device is reachable over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Gigabit Ethernet Vision
    GigE,
    /// USB3 Vision
    Usb,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::GigE => write!(f, "GigE"),
            TransportKind::Usb => write!(f, "USB"),
        }
    }
}

/// Bit mask selecting which transports an enumeration should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportMask(u32);

impl TransportMask {
    /// GigE Vision devices only
    pub const GIGE: TransportMask = TransportMask(1 << 0);
    /// USB3 Vision devices only
    pub const USB: TransportMask = TransportMask(1 << 1);
    /// Every supported transport
    pub const ALL: TransportMask = TransportMask((1 << 0) | (1 << 1));

    /// Whether devices on the given transport are selected by this mask
    pub fn contains(&self, kind: TransportKind) -> bool {
        match kind {
            TransportKind::GigE => self.0 & Self::GIGE.0 != 0,
            TransportKind::Usb => self.0 & Self::USB.0 != 0,
        }
    }
}

impl Default for TransportMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Geometry and format of one delivered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format of the payload
    pub pixel_format: PixelFormat,
    /// Driver-assigned frame counter
    pub frame_id: u64,
}

impl FrameMeta {
    /// Payload bytes implied by the geometry, when the depth is known
    pub fn expected_len(&self) -> Option<usize> {
        self.pixel_format
            .bytes_per_pixel()
            .map(|bpp| self.width as usize * self.height as usize * bpp)
    }
}

/// A transient, non-owning view of one retrieved frame
///
/// The payload slice borrows a buffer owned by the session, so the borrow
/// checker enforces the validity window: the view must be dropped before the
/// next retrieval call on the same session, which overwrites the buffer in
/// place. Copy the bytes out if they need to outlive that window.
#[derive(Debug)]
pub struct FrameView<'a> {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format of `data`
    pub pixel_format: PixelFormat,
    /// Driver-assigned frame counter
    pub frame_id: u64,
    /// The frame payload
    pub data: &'a [u8],
}

impl FrameView<'_> {
    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outcome of one frame-retrieval call
///
/// `Empty` means the driver had no frame ready within the timeout. It is the
/// normal idle case when polling faster than the device delivers, and is
/// deliberately not an error so callers can tell "try again" apart from
/// "something is wrong."
#[derive(Debug)]
pub enum Grab<'a> {
    /// A frame was delivered
    Frame(FrameView<'a>),
    /// No frame became ready within the timeout
    Empty,
}

impl<'a> Grab<'a> {
    /// True when no frame was delivered
    pub fn is_empty(&self) -> bool {
        matches!(self, Grab::Empty)
    }

    /// The delivered frame, if any
    pub fn frame(&self) -> Option<&FrameView<'a>> {
        match self {
            Grab::Frame(view) => Some(view),
            Grab::Empty => None,
        }
    }
}

/// Cooperative cancellation signal for acquisition loops
///
/// Clones share one flag. The acquisition loop checks the token between
/// frames and between reconnect attempts; nothing is preempted, so a blocked
/// grab still runs to its timeout before the cancellation is observed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; all clones observe it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
