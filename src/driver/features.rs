//! GenICam feature names understood by conforming cameras
//!
//! These are the string keys passed to the generic get/set calls on
//! [`CameraDriver`](super::CameraDriver). The names follow the SFNC
//! (Standard Features Naming Convention), so they are stable across vendors.

/// Acquisition frame rate in Hz (float)
pub const ACQUISITION_FRAME_RATE: &str = "AcquisitionFrameRate";
/// Switch that must be on before the frame rate accepts writes on some
/// models (enum: 0 off, 1 on)
pub const ACQUISITION_FRAME_RATE_ENABLE: &str = "AcquisitionFrameRateEnable";
/// Pixel format of the stream (enum of wire-format codes)
pub const PIXEL_FORMAT: &str = "PixelFormat";
/// Exposure time in microseconds (float)
pub const EXPOSURE_TIME: &str = "ExposureTime";
/// Analog gain in dB (float)
pub const GAIN: &str = "Gain";
/// Trigger mode (enum: 0 off, 1 on)
pub const TRIGGER_MODE: &str = "TriggerMode";
/// Fire one software trigger (command)
pub const TRIGGER_SOFTWARE: &str = "TriggerSoftware";
/// Image width in pixels (int)
pub const WIDTH: &str = "Width";
/// Image height in pixels (int)
pub const HEIGHT: &str = "Height";
/// GigE stream channel packet size in bytes (int)
pub const GEV_SCPS_PACKET_SIZE: &str = "GevSCPSPacketSize";
/// GigE inter-packet delay in timestamp ticks (int)
pub const GEV_SCPD: &str = "GevSCPD";
/// Frame rate the device will actually achieve under current settings,
/// in Hz (float, read-only)
pub const RESULTING_FRAME_RATE: &str = "ResultingFrameRate";
/// Bytes per frame on the wire (int, read-only)
pub const PAYLOAD_SIZE: &str = "PayloadSize";

/// Enum entry code for "off" on switch-like features
pub const SWITCH_OFF: u32 = 0;
/// Enum entry code for "on" on switch-like features
pub const SWITCH_ON: u32 = 1;
