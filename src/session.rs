//! Camera session: connection lifecycle and frame acquisition
//!
//! A [`CameraSession`] owns one driver connection and walks it through
//! closed -> open -> grabbing. Two invariants hold after every operation:
//! a grabbing session is open, and the driver handle exists exactly while
//! the session is open.
//!
//! Grabbed frames are copied into session-owned buffers and the driver's
//! pool slot is released before the call returns, so a returned
//! [`FrameView`] stays valid until the next grab regardless of what the
//! driver does with its pool.

use crate::buffer::ImageBuffer;
use crate::directory::DeviceDescriptor;
use crate::driver::{features, CameraDriver, DriverFrame, Fetch, Handle, RawDeviceInfo};
use crate::error::{CamError, Result};
use crate::params::ParamStore;
use crate::types::{FrameView, Grab, PixelFormat, TransportMask};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Output format of [`CameraSession::grab_converted`]
pub const TARGET_FORMAT: PixelFormat = PixelFormat::Bgr8;

const TARGET_BYTES_PER_PIXEL: usize = 3;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No driver handle exists
    Closed,
    /// Connected, not streaming
    Open,
    /// Connected and streaming
    Grabbing,
}

/// Running acquisition counters
///
/// Empty grabs (timeouts with no frame) are tracked separately and count
/// neither for nor against the success rate.
#[derive(Debug, Clone, Default)]
pub struct GrabStats {
    pub frames: u64,
    pub empty_grabs: u64,
    pub failed_grabs: u64,
    pub total_bytes: u64,
    pub last_grab_time_us: u64,
    pub total_grab_time_us: u64,
}

impl GrabStats {
    pub fn record_frame(&mut self, time_us: u64, bytes: usize) {
        self.frames += 1;
        self.total_bytes += bytes as u64;
        self.last_grab_time_us = time_us;
        self.total_grab_time_us += time_us;
    }

    pub fn record_empty(&mut self) {
        self.empty_grabs += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed_grabs += 1;
    }

    /// Mean time per delivered frame in microseconds
    pub fn avg_grab_time_us(&self) -> u64 {
        if self.frames == 0 {
            0
        } else {
            self.total_grab_time_us / self.frames
        }
    }

    /// Delivered frames over delivered-plus-failed, in 0.0..=1.0
    pub fn success_rate(&self) -> f64 {
        let attempts = self.frames + self.failed_grabs;
        if attempts == 0 {
            1.0
        } else {
            self.frames as f64 / attempts as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One camera connection with its cached configuration and frame buffers
pub struct CameraSession<D: CameraDriver> {
    driver: D,
    state: SessionState,
    handle: Option<Handle>,
    device: Option<(usize, DeviceDescriptor)>,
    transports: TransportMask,
    params: ParamStore,
    raw_buffer: ImageBuffer,
    convert_buffer: ImageBuffer,
    stats: GrabStats,
}

impl<D: CameraDriver> CameraSession<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            state: SessionState::Closed,
            handle: None,
            device: None,
            transports: TransportMask::ALL,
            params: ParamStore::new(),
            raw_buffer: ImageBuffer::new(),
            convert_buffer: ImageBuffer::new(),
            stats: GrabStats::default(),
        }
    }

    /// Restrict which transports `open` will enumerate
    pub fn with_transports(mut self, transports: TransportMask) -> Self {
        self.transports = transports;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != SessionState::Closed
    }

    pub fn is_grabbing(&self) -> bool {
        self.state == SessionState::Grabbing
    }

    /// Identity of the connected device, while open
    pub fn device(&self) -> Option<&DeviceDescriptor> {
        self.device.as_ref().map(|(_, d)| d)
    }

    /// Enumeration index the device was opened at, while open
    pub fn device_index(&self) -> Option<usize> {
        self.device.as_ref().map(|(i, _)| *i)
    }

    /// Configuration that has been successfully applied to the device
    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    pub fn stats(&self) -> &GrabStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    // ==================== Lifecycle ====================

    /// Open the device at `index` in a fresh enumeration
    ///
    /// On success the session is `Open` and triggering has been disabled as
    /// far as the device allows (a refusal is logged, not fatal). On failure
    /// no handle is left behind.
    pub fn open(&mut self, index: usize) -> Result<()> {
        self.ensure_closed()?;
        let raw = self.enumerate_raw()?;
        if index >= raw.len() {
            return Err(CamError::InvalidIndex {
                index,
                available: raw.len(),
            });
        }
        self.open_at(raw, index)
    }

    /// Open the first device whose serial number matches exactly
    pub fn open_by_serial(&mut self, serial: &str) -> Result<()> {
        self.ensure_closed()?;
        let raw = self.enumerate_raw()?;
        let index = raw
            .iter()
            .position(|d| d.serial == serial)
            .ok_or_else(|| CamError::SerialNotFound(serial.to_string()))?;
        self.open_at(raw, index)
    }

    fn ensure_closed(&self) -> Result<()> {
        if self.state != SessionState::Closed {
            return Err(CamError::AlreadyOpen);
        }
        Ok(())
    }

    fn enumerate_raw(&mut self) -> Result<Vec<RawDeviceInfo>> {
        self.driver
            .enumerate(self.transports)
            .map_err(|e| CamError::driver("EnumerateDevices", e.code))
    }

    fn open_at(&mut self, raw: Vec<RawDeviceInfo>, index: usize) -> Result<()> {
        let info = &raw[index];
        let descriptor = DeviceDescriptor::from_raw(info);
        info!("Opening device {}: {}", index, descriptor);

        let handle = self
            .driver
            .create_handle(info)
            .map_err(|e| CamError::driver("CreateHandle", e.code))?;
        if let Err(e) = self.driver.open_device(handle) {
            self.driver.destroy_handle(handle);
            return Err(CamError::driver("OpenDevice", e.code));
        }
        self.handle = Some(handle);
        self.device = Some((index, descriptor));
        self.state = SessionState::Open;

        // Some models boot with triggering on and would deliver nothing in
        // free-run. The store keeps whatever the caller asked for; this
        // write is device init, not configuration.
        if let Err(e) = self
            .driver
            .set_enum(handle, features::TRIGGER_MODE, features::SWITCH_OFF)
        {
            warn!("Could not disable trigger mode after open: {}", e);
        }
        Ok(())
    }

    /// Tear the connection down, tolerating driver errors
    ///
    /// Stop and close are attempted in order and their failures logged; the
    /// handle is destroyed and forgotten no matter what. Safe to call in any
    /// state, any number of times. Applied configuration, buffers and stats
    /// survive for the next open.
    pub fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            self.state = SessionState::Closed;
            return;
        };
        if let Err(e) = self.driver.stop_grabbing(handle) {
            debug!("Stop grabbing during close: {}", e);
        }
        if let Err(e) = self.driver.close_device(handle) {
            warn!("Device close failed: {}", e);
        }
        self.driver.destroy_handle(handle);
        self.device = None;
        self.state = SessionState::Closed;
        debug!("Session closed");
    }

    /// Start streaming; a no-op if already grabbing
    pub fn start_grabbing(&mut self) -> Result<()> {
        if self.state == SessionState::Grabbing {
            return Ok(());
        }
        let handle = self.require_handle()?;
        self.driver
            .start_grabbing(handle)
            .map_err(|e| CamError::driver("StartGrabbing", e.code))?;
        self.state = SessionState::Grabbing;
        info!("Acquisition started");
        Ok(())
    }

    /// Stop streaming; a no-op if not grabbing
    pub fn stop_grabbing(&mut self) -> Result<()> {
        if self.state != SessionState::Grabbing {
            return Ok(());
        }
        let handle = self.require_handle()?;
        self.driver
            .stop_grabbing(handle)
            .map_err(|e| CamError::driver("StopGrabbing", e.code))?;
        self.state = SessionState::Open;
        info!("Acquisition stopped");
        Ok(())
    }

    fn require_handle(&self) -> Result<Handle> {
        self.handle.ok_or(CamError::NotOpen)
    }

    // ==================== Acquisition ====================

    /// Wait up to `timeout` for the next frame in its wire format
    ///
    /// The returned view borrows a session-owned copy and stays valid until
    /// the next grab; the driver's pool slot is already released when this
    /// returns. A timeout with no frame is [`Grab::Empty`], not an error.
    pub fn grab_raw(&mut self, timeout: Duration) -> Result<Grab<'_>> {
        if self.state != SessionState::Grabbing {
            return Err(CamError::NotGrabbing);
        }
        let handle = self.require_handle()?;
        let started = Instant::now();
        match self.driver.fetch_frame(handle, timeout) {
            Ok(Fetch::NoData) => {
                self.stats.record_empty();
                trace!("No frame within {:?}", timeout);
                Ok(Grab::Empty)
            }
            Ok(Fetch::Frame(frame)) => {
                let DriverFrame { meta, data, token } = frame;
                if let Some(expected) = meta.expected_len() {
                    if data.len() < expected {
                        self.driver.release_frame(handle, token);
                        self.stats.record_failure();
                        return Err(CamError::MalformedFrame {
                            expected,
                            actual: data.len(),
                        });
                    }
                }
                let copied = self.raw_buffer.store(&data);
                self.driver.release_frame(handle, token);
                self.stats
                    .record_frame(started.elapsed().as_micros() as u64, copied.len());
                trace!(
                    "Frame {}: {}x{} {} ({} bytes)",
                    meta.frame_id,
                    meta.width,
                    meta.height,
                    meta.pixel_format,
                    copied.len()
                );
                Ok(Grab::Frame(FrameView {
                    width: meta.width,
                    height: meta.height,
                    pixel_format: meta.pixel_format,
                    frame_id: meta.frame_id,
                    data: copied,
                }))
            }
            Err(e) => {
                self.stats.record_failure();
                Err(CamError::driver("FetchFrame", e.code))
            }
        }
    }

    /// Wait up to `timeout` for the next frame, converted to [`TARGET_FORMAT`]
    ///
    /// Output is always `width * height * 3` bytes. Frames already in the
    /// target format are copied directly; anything else goes through the
    /// driver's converter. The driver's pool slot is released before this
    /// returns, including when conversion fails.
    pub fn grab_converted(&mut self, timeout: Duration) -> Result<Grab<'_>> {
        if self.state != SessionState::Grabbing {
            return Err(CamError::NotGrabbing);
        }
        let handle = self.require_handle()?;
        let started = Instant::now();
        let frame = match self.driver.fetch_frame(handle, timeout) {
            Ok(Fetch::NoData) => {
                self.stats.record_empty();
                trace!("No frame within {:?}", timeout);
                return Ok(Grab::Empty);
            }
            Ok(Fetch::Frame(frame)) => frame,
            Err(e) => {
                self.stats.record_failure();
                return Err(CamError::driver("FetchFrame", e.code));
            }
        };
        let DriverFrame { meta, data, token } = frame;
        let required = meta.width as usize * meta.height as usize * TARGET_BYTES_PER_PIXEL;
        let dst = self.convert_buffer.ensure(required);
        let outcome = if meta.pixel_format == TARGET_FORMAT {
            if data.len() >= required {
                dst.copy_from_slice(&data[..required]);
                Ok(required)
            } else {
                Err(CamError::MalformedFrame {
                    expected: required,
                    actual: data.len(),
                })
            }
        } else {
            self.driver
                .convert_pixel_format(handle, &data, &meta, dst, TARGET_FORMAT)
                .map_err(|e| CamError::driver("ConvertPixelFormat", e.code))
        };
        // The pool slot goes back before we report either way.
        self.driver.release_frame(handle, token);
        let written = match outcome {
            Ok(n) => n,
            Err(e) => {
                self.stats.record_failure();
                return Err(e);
            }
        };
        self.stats
            .record_frame(started.elapsed().as_micros() as u64, written);
        Ok(Grab::Frame(FrameView {
            width: meta.width,
            height: meta.height,
            pixel_format: TARGET_FORMAT,
            frame_id: meta.frame_id,
            data: self.convert_buffer.filled(written),
        }))
    }

    // ==================== Configuration ====================

    /// Set the exposure time in microseconds
    pub fn set_exposure_time(&mut self, micros: f64) -> Result<()> {
        let handle = self.require_handle()?;
        self.driver
            .set_float(handle, features::EXPOSURE_TIME, micros)
            .map_err(|e| CamError::driver("SetExposureTime", e.code))?;
        self.params.exposure_us = Some(micros);
        debug!("Exposure time set to {} us", micros);
        Ok(())
    }

    /// Set the analog gain in dB
    pub fn set_gain(&mut self, db: f64) -> Result<()> {
        let handle = self.require_handle()?;
        self.driver
            .set_float(handle, features::GAIN, db)
            .map_err(|e| CamError::driver("SetGain", e.code))?;
        self.params.gain_db = Some(db);
        debug!("Gain set to {} dB", db);
        Ok(())
    }

    /// Set the acquisition frame rate in Hz
    ///
    /// Some models keep the frame rate read-only until its enable switch is
    /// on; a rejected first write flips the switch and retries once.
    pub fn set_frame_rate(&mut self, hz: f64) -> Result<()> {
        let handle = self.require_handle()?;
        if let Err(first) = self
            .driver
            .set_float(handle, features::ACQUISITION_FRAME_RATE, hz)
        {
            debug!(
                "Frame rate write rejected (status 0x{:08X}), enabling frame rate control and retrying",
                first.code
            );
            // The enable write is best-effort; only the retry's status counts
            if let Err(e) = self.driver.set_enum(
                handle,
                features::ACQUISITION_FRAME_RATE_ENABLE,
                features::SWITCH_ON,
            ) {
                debug!("Frame rate enable switch rejected (status 0x{:08X})", e.code);
            }
            self.driver
                .set_float(handle, features::ACQUISITION_FRAME_RATE, hz)
                .map_err(|e| CamError::driver("SetFrameRate", e.code))?;
        }
        self.params.frame_rate_hz = Some(hz);
        debug!("Frame rate set to {} Hz", hz);
        Ok(())
    }

    /// Set the stream pixel format
    pub fn set_pixel_format(&mut self, format: PixelFormat) -> Result<()> {
        let handle = self.require_handle()?;
        self.driver
            .set_enum(handle, features::PIXEL_FORMAT, format.code())
            .map_err(|e| CamError::driver("SetPixelFormat", e.code))?;
        self.params.pixel_format = Some(format);
        debug!("Pixel format set to {}", format);
        Ok(())
    }

    /// Turn hardware/software triggering on or off
    pub fn set_trigger_mode(&mut self, enabled: bool) -> Result<()> {
        let handle = self.require_handle()?;
        let value = if enabled {
            features::SWITCH_ON
        } else {
            features::SWITCH_OFF
        };
        self.driver
            .set_enum(handle, features::TRIGGER_MODE, value)
            .map_err(|e| CamError::driver("SetTriggerMode", e.code))?;
        self.params.trigger_enabled = enabled;
        debug!("Trigger mode {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Set the GigE stream packet size in bytes
    ///
    /// Connection-specific, so not replayed after a reconnect; re-apply it
    /// from configuration if it matters.
    pub fn set_packet_size(&mut self, bytes: i64) -> Result<()> {
        let handle = self.require_handle()?;
        self.driver
            .set_int(handle, features::GEV_SCPS_PACKET_SIZE, bytes)
            .map_err(|e| CamError::driver("SetPacketSize", e.code))?;
        debug!("Packet size set to {} bytes", bytes);
        Ok(())
    }

    /// Set the GigE inter-packet delay in timestamp ticks
    pub fn set_packet_delay(&mut self, ticks: i64) -> Result<()> {
        let handle = self.require_handle()?;
        self.driver
            .set_int(handle, features::GEV_SCPD, ticks)
            .map_err(|e| CamError::driver("SetPacketDelay", e.code))?;
        debug!("Packet delay set to {} ticks", ticks);
        Ok(())
    }

    /// Fire one software trigger
    pub fn trigger_software(&mut self) -> Result<()> {
        let handle = self.require_handle()?;
        self.driver
            .send_command(handle, features::TRIGGER_SOFTWARE)
            .map_err(|e| CamError::driver("TriggerSoftware", e.code))
    }

    // ==================== Readback ====================
    // Readback getters never fail: a closed session or a refused driver
    // query reads as zero (or the unknown format).

    pub fn exposure_time(&mut self) -> f64 {
        self.float_feature(features::EXPOSURE_TIME)
    }

    pub fn gain(&mut self) -> f64 {
        self.float_feature(features::GAIN)
    }

    pub fn frame_rate(&mut self) -> f64 {
        self.float_feature(features::ACQUISITION_FRAME_RATE)
    }

    /// Frame rate the device will actually achieve under current settings
    pub fn resulting_frame_rate(&mut self) -> f64 {
        self.float_feature(features::RESULTING_FRAME_RATE)
    }

    pub fn width(&mut self) -> i64 {
        self.int_feature(features::WIDTH)
    }

    pub fn height(&mut self) -> i64 {
        self.int_feature(features::HEIGHT)
    }

    /// Bytes per frame on the wire
    pub fn payload_size(&mut self) -> i64 {
        self.int_feature(features::PAYLOAD_SIZE)
    }

    pub fn packet_size(&mut self) -> i64 {
        self.int_feature(features::GEV_SCPS_PACKET_SIZE)
    }

    pub fn packet_delay(&mut self) -> i64 {
        self.int_feature(features::GEV_SCPD)
    }

    pub fn pixel_format(&mut self) -> PixelFormat {
        let Some(handle) = self.handle else {
            return PixelFormat::Unknown(0);
        };
        match self.driver.get_enum(handle, features::PIXEL_FORMAT) {
            Ok(v) => PixelFormat::from_code(v.current),
            Err(e) => {
                trace!("Pixel format readback failed: {}", e);
                PixelFormat::Unknown(0)
            }
        }
    }

    fn float_feature(&mut self, feature: &str) -> f64 {
        let Some(handle) = self.handle else {
            return 0.0;
        };
        match self.driver.get_float(handle, feature) {
            Ok(v) => v.current,
            Err(e) => {
                trace!("Readback of {} failed: {}", feature, e);
                0.0
            }
        }
    }

    fn int_feature(&mut self, feature: &str) -> i64 {
        let Some(handle) = self.handle else {
            return 0;
        };
        match self.driver.get_int(handle, feature) {
            Ok(v) => v.current,
            Err(e) => {
                trace!("Readback of {} failed: {}", feature, e);
                0
            }
        }
    }

    /// Log the device's geometry and timing ranges at info level
    pub fn log_capabilities(&mut self) {
        let Some(handle) = self.handle else {
            debug!("No open device to describe");
            return;
        };
        if let Ok(v) = self.driver.get_int(handle, features::WIDTH) {
            info!("Width: {} px (range {}..={})", v.current, v.min, v.max);
        }
        if let Ok(v) = self.driver.get_int(handle, features::HEIGHT) {
            info!("Height: {} px (range {}..={})", v.current, v.min, v.max);
        }
        if let Ok(v) = self.driver.get_int(handle, features::PAYLOAD_SIZE) {
            info!("Payload: {} bytes per frame", v.current);
        }
        if let Ok(v) = self.driver.get_float(handle, features::EXPOSURE_TIME) {
            info!("Exposure: {} us (range {}..={})", v.current, v.min, v.max);
        }
        if let Ok(v) = self.driver.get_float(handle, features::GAIN) {
            info!("Gain: {} dB (range {}..={})", v.current, v.min, v.max);
        }
        if let Ok(v) = self
            .driver
            .get_float(handle, features::RESULTING_FRAME_RATE)
        {
            info!("Resulting frame rate: {} Hz", v.current);
        }
        if let Ok(v) = self.driver.get_enum(handle, features::PIXEL_FORMAT) {
            info!("Pixel format: {}", PixelFormat::from_code(v.current));
        }
    }

    /// Re-apply everything the store holds to a freshly opened device
    ///
    /// Individual refusals are logged and skipped; by the store's contract
    /// every held value was accepted by this device once already.
    pub(crate) fn replay_params(&mut self) {
        let stored = self.params.clone();
        if let Some(v) = stored.exposure_us {
            if let Err(e) = self.set_exposure_time(v) {
                warn!("Replaying exposure time failed: {}", e);
            }
        }
        if let Some(v) = stored.gain_db {
            if let Err(e) = self.set_gain(v) {
                warn!("Replaying gain failed: {}", e);
            }
        }
        if let Some(v) = stored.frame_rate_hz {
            if let Err(e) = self.set_frame_rate(v) {
                warn!("Replaying frame rate failed: {}", e);
            }
        }
        if let Some(v) = stored.pixel_format {
            if let Err(e) = self.set_pixel_format(v) {
                warn!("Replaying pixel format failed: {}", e);
            }
        }
        if let Err(e) = self.set_trigger_mode(stored.trigger_enabled) {
            warn!("Replaying trigger mode failed: {}", e);
        }
    }
}

impl<D: CameraDriver> Drop for CameraSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}
