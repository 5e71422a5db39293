//! Simulated camera for testing without real hardware
//!
//! [`MockCamera`] implements [`CameraDriver`] over shared interior state, so
//! a test can keep one clone as a control plane (to inject link drops, fetch
//! failures, rejected feature writes) while the session under test owns
//! another. Frame payloads are deterministic, letting tests assert on
//! converted output byte-for-byte.

use super::{
    features, status, CameraDriver, DriverError, DriverFrame, EnumValue, Fetch, FloatValue,
    FrameToken, Handle, IntValue, RawDeviceInfo,
};
use crate::types::{FrameMeta, PixelFormat, TransportKind, TransportMask};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

const DEFAULT_POOL_SLOTS: usize = 8;

/// One simulated device visible to enumeration
#[derive(Debug, Clone)]
pub struct MockDevice {
    serial: String,
    model: String,
    transport: TransportKind,
    packed_ip: Option<u32>,
    width: i64,
    height: i64,
    pixel_format: PixelFormat,
    exposure_us: f64,
    gain_db: f64,
    frame_rate_hz: f64,
    frame_rate_enabled: bool,
    require_frame_rate_enable: bool,
    trigger_mode: u32,
    pending_triggers: u32,
    packet_size: i64,
    packet_delay: i64,
}

impl MockDevice {
    fn base(serial: &str, model: &str, transport: TransportKind, packed_ip: Option<u32>) -> Self {
        Self {
            serial: serial.to_string(),
            model: model.to_string(),
            transport,
            packed_ip,
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Mono8,
            exposure_us: 20_000.0,
            gain_db: 0.0,
            frame_rate_hz: 30.0,
            frame_rate_enabled: false,
            require_frame_rate_enable: false,
            trigger_mode: features::SWITCH_OFF,
            pending_triggers: 0,
            packet_size: 1500,
            packet_delay: 0,
        }
    }

    /// A GigE device at the given IPv4 address
    pub fn gige(serial: &str, model: &str, ip: [u8; 4]) -> Self {
        Self::base(serial, model, TransportKind::GigE, Some(u32::from_be_bytes(ip)))
    }

    /// A USB3 Vision device (no network address)
    pub fn usb(serial: &str, model: &str) -> Self {
        Self::base(serial, model, TransportKind::Usb, None)
    }

    /// Override the sensor geometry and stream format
    pub fn with_sensor(mut self, width: i64, height: i64, format: PixelFormat) -> Self {
        self.width = width;
        self.height = height;
        self.pixel_format = format;
        self
    }

    /// Make the frame rate writable only after its enable switch is on,
    /// as some camera models require
    pub fn with_frame_rate_interlock(mut self) -> Self {
        self.require_frame_rate_enable = true;
        self
    }

    fn payload_len(&self) -> usize {
        let bpp = self.pixel_format.bytes_per_pixel().unwrap_or(1);
        self.width as usize * self.height as usize * bpp
    }

    fn info(&self) -> RawDeviceInfo {
        RawDeviceInfo {
            transport: self.transport,
            serial: self.serial.clone(),
            model: self.model.clone(),
            packed_ip: self.packed_ip,
        }
    }
}

/// One successful feature write or command, as recorded by the journal
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Enum(String, u32),
    Float(String, f64),
    Int(String, i64),
    Command(String),
}

#[derive(Debug, Clone, Copy)]
struct HandleState {
    device: usize,
    open: bool,
    grabbing: bool,
}

#[derive(Debug, Default)]
struct MockInner {
    devices: Vec<MockDevice>,
    handles: HashMap<u64, HandleState>,
    next_handle: u64,
    pool_slots: usize,
    outstanding: HashMap<u64, u64>,
    next_token: u64,
    frame_counter: u64,
    fetch_count: u64,
    release_count: u64,
    applied: Vec<Applied>,
    link_up: bool,
    fail_opens_remaining: u32,
    fail_next_start: Option<u32>,
    fail_next_fetch: Option<u32>,
    fail_next_convert: Option<u32>,
    fail_next_set: HashMap<String, u32>,
    queued_no_data: u32,
    frame_interval: Duration,
}

impl MockInner {
    fn handle_state(&self, handle: Handle) -> Result<HandleState, DriverError> {
        self.handles
            .get(&handle.as_raw())
            .copied()
            .ok_or(DriverError::new(status::BAD_HANDLE))
    }

    fn open_device_index(&self, handle: Handle) -> Result<usize, DriverError> {
        let state = self.handle_state(handle)?;
        if !state.open {
            return Err(DriverError::new(status::BAD_HANDLE));
        }
        Ok(state.device)
    }

    fn check_fail_set(&mut self, feature: &str) -> Result<(), DriverError> {
        match self.fail_next_set.remove(feature) {
            Some(code) => Err(DriverError::new(code)),
            None => Ok(()),
        }
    }
}

/// Scriptable in-process camera driver
///
/// Clones share state, so keep one clone for scripting and inspection while
/// the session owns another.
#[derive(Debug, Clone)]
pub struct MockCamera {
    inner: Arc<Mutex<MockInner>>,
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCamera {
    pub fn new() -> Self {
        let inner = MockInner {
            pool_slots: DEFAULT_POOL_SLOTS,
            link_up: true,
            ..Default::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a simulated device
    pub fn with_device(self, device: MockDevice) -> Self {
        self.lock().devices.push(device);
        self
    }

    /// Override the number of frame pool slots
    pub fn with_pool_slots(self, slots: usize) -> Self {
        self.lock().pool_slots = slots;
        self
    }

    /// Pace frame delivery instead of answering fetches instantly
    ///
    /// A fetch whose timeout is shorter than the interval sleeps the timeout
    /// and reports no data, like a real camera that has not finished an
    /// exposure yet. Zero (the default) delivers immediately.
    pub fn with_frame_interval(self, interval: Duration) -> Self {
        self.lock().frame_interval = interval;
        self
    }

    // ==================== Fault injection ====================

    /// Fail the next `count` device opens with a link-down status
    pub fn fail_opens(&self, count: u32) {
        self.lock().fail_opens_remaining = count;
    }

    /// Fail the next start-grabbing call with the given status code
    pub fn fail_next_start(&self, code: u32) {
        self.lock().fail_next_start = Some(code);
    }

    /// Fail the next fetch with the given status code
    pub fn fail_next_fetch(&self, code: u32) {
        self.lock().fail_next_fetch = Some(code);
    }

    /// Fail the next pixel conversion with the given status code
    pub fn fail_next_convert(&self, code: u32) {
        self.lock().fail_next_convert = Some(code);
    }

    /// Fail the next write to `feature` with the given status code
    pub fn fail_next_set(&self, feature: &str, code: u32) {
        self.lock().fail_next_set.insert(feature.to_string(), code);
    }

    /// Cut the link: opens and fetches fail until [`link_up`](Self::link_up)
    pub fn link_down(&self) {
        self.lock().link_up = false;
    }

    /// Restore the link
    pub fn link_up(&self) {
        self.lock().link_up = true;
    }

    /// Answer the next `count` fetches with no-data instead of a frame
    pub fn queue_no_data(&self, count: u32) {
        self.lock().queued_no_data = count;
    }

    /// Change a device's sensor geometry, e.g. to simulate an ROI change
    pub fn resize_sensor(&self, device: usize, width: i64, height: i64) {
        let mut inner = self.lock();
        inner.devices[device].width = width;
        inner.devices[device].height = height;
    }

    // ==================== Inspection ====================

    /// Successful feature writes and commands, oldest first
    pub fn applied(&self) -> Vec<Applied> {
        self.lock().applied.clone()
    }

    /// Forget the journal, e.g. between an open and the writes under test
    pub fn clear_applied(&self) {
        self.lock().applied.clear();
    }

    /// Frames fetched but not yet released
    pub fn outstanding_frames(&self) -> usize {
        self.lock().outstanding.len()
    }

    /// Total successful fetches
    pub fn fetch_count(&self) -> u64 {
        self.lock().fetch_count
    }

    /// Total frame releases
    pub fn release_count(&self) -> u64 {
        self.lock().release_count
    }

    /// Handles created and not yet destroyed
    pub fn live_handles(&self) -> usize {
        self.lock().handles.len()
    }
}

/// The payload the simulator generates for frame `frame_id`
///
/// Deterministic, so tests can predict converted output byte-for-byte.
pub fn pattern_payload(frame_id: u64, len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i as u64 + frame_id * 31) % 251) as u8).collect()
}

fn convert_to_bgr(src: &[u8], meta: &FrameMeta, dst: &mut [u8]) -> Result<usize, DriverError> {
    let pixels = meta.width as usize * meta.height as usize;
    let required = pixels * 3;
    if dst.len() < required {
        return Err(DriverError::new(status::BUFFER_TOO_SMALL));
    }
    match meta.pixel_format {
        PixelFormat::Bgr8 => {
            if src.len() != required {
                return Err(DriverError::new(status::BAD_PARAMETER));
            }
            dst[..required].copy_from_slice(src);
        }
        PixelFormat::Rgb8 => {
            if src.len() != required {
                return Err(DriverError::new(status::BAD_PARAMETER));
            }
            for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(3)) {
                d[0] = s[2];
                d[1] = s[1];
                d[2] = s[0];
            }
        }
        PixelFormat::Mono8
        | PixelFormat::BayerGR8
        | PixelFormat::BayerRG8
        | PixelFormat::BayerGB8
        | PixelFormat::BayerBG8 => {
            if src.len() != pixels {
                return Err(DriverError::new(status::BAD_PARAMETER));
            }
            // Grey replication stands in for demosaicing; good enough for a
            // simulator.
            for (i, &v) in src.iter().enumerate() {
                dst[i * 3] = v;
                dst[i * 3 + 1] = v;
                dst[i * 3 + 2] = v;
            }
        }
        PixelFormat::Mono12 => {
            if src.len() != pixels * 2 {
                return Err(DriverError::new(status::BAD_PARAMETER));
            }
            for (i, chunk) in src.chunks_exact(2).enumerate() {
                let v = chunk[1];
                dst[i * 3] = v;
                dst[i * 3 + 1] = v;
                dst[i * 3 + 2] = v;
            }
        }
        PixelFormat::Yuv422_8 => {
            if src.len() != pixels * 2 {
                return Err(DriverError::new(status::BAD_PARAMETER));
            }
            for i in 0..pixels {
                let y = src[i * 2];
                dst[i * 3] = y;
                dst[i * 3 + 1] = y;
                dst[i * 3 + 2] = y;
            }
        }
        PixelFormat::Unknown(_) => return Err(DriverError::new(status::CONVERT_FAILED)),
    }
    Ok(required)
}

impl CameraDriver for MockCamera {
    fn enumerate(&mut self, transports: TransportMask) -> Result<Vec<RawDeviceInfo>, DriverError> {
        let inner = self.lock();
        Ok(inner
            .devices
            .iter()
            .filter(|d| transports.contains(d.transport))
            .map(|d| d.info())
            .collect())
    }

    fn create_handle(&mut self, info: &RawDeviceInfo) -> Result<Handle, DriverError> {
        let mut inner = self.lock();
        let device = inner
            .devices
            .iter()
            .position(|d| d.serial == info.serial)
            .ok_or(DriverError::new(status::BAD_PARAMETER))?;
        inner.next_handle += 1;
        let raw = inner.next_handle;
        inner.handles.insert(
            raw,
            HandleState {
                device,
                open: false,
                grabbing: false,
            },
        );
        Ok(Handle::from_raw(raw))
    }

    fn destroy_handle(&mut self, handle: Handle) {
        let mut inner = self.lock();
        inner.handles.remove(&handle.as_raw());
        inner.outstanding.retain(|_, h| *h != handle.as_raw());
    }

    fn open_device(&mut self, handle: Handle) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let state = inner.handle_state(handle)?;
        if state.open {
            return Err(DriverError::new(status::CALL_ORDER));
        }
        if inner.fail_opens_remaining > 0 {
            inner.fail_opens_remaining -= 1;
            return Err(DriverError::new(status::LINK_DOWN));
        }
        if !inner.link_up {
            return Err(DriverError::new(status::LINK_DOWN));
        }
        if let Some(s) = inner.handles.get_mut(&handle.as_raw()) {
            s.open = true;
        }
        Ok(())
    }

    fn close_device(&mut self, handle: Handle) -> Result<(), DriverError> {
        let mut inner = self.lock();
        inner.handle_state(handle)?;
        if let Some(s) = inner.handles.get_mut(&handle.as_raw()) {
            s.open = false;
            s.grabbing = false;
        }
        // Closing reclaims the device's pool slots.
        inner.outstanding.retain(|_, h| *h != handle.as_raw());
        Ok(())
    }

    fn set_enum(&mut self, handle: Handle, feature: &str, value: u32) -> Result<(), DriverError> {
        let mut inner = self.lock();
        inner.check_fail_set(feature)?;
        let device = inner.open_device_index(handle)?;
        let dev = &mut inner.devices[device];
        match feature {
            features::PIXEL_FORMAT => dev.pixel_format = PixelFormat::from_code(value),
            features::TRIGGER_MODE => dev.trigger_mode = value,
            features::ACQUISITION_FRAME_RATE_ENABLE => {
                dev.frame_rate_enabled = value == features::SWITCH_ON
            }
            _ => return Err(DriverError::new(status::NOT_SUPPORTED)),
        }
        inner.applied.push(Applied::Enum(feature.to_string(), value));
        Ok(())
    }

    fn set_float(&mut self, handle: Handle, feature: &str, value: f64) -> Result<(), DriverError> {
        let mut inner = self.lock();
        inner.check_fail_set(feature)?;
        let device = inner.open_device_index(handle)?;
        let dev = &mut inner.devices[device];
        match feature {
            features::EXPOSURE_TIME => dev.exposure_us = value,
            features::GAIN => dev.gain_db = value,
            features::ACQUISITION_FRAME_RATE => {
                if dev.require_frame_rate_enable && !dev.frame_rate_enabled {
                    return Err(DriverError::new(status::NOT_SUPPORTED));
                }
                dev.frame_rate_hz = value;
            }
            _ => return Err(DriverError::new(status::NOT_SUPPORTED)),
        }
        inner.applied.push(Applied::Float(feature.to_string(), value));
        Ok(())
    }

    fn set_int(&mut self, handle: Handle, feature: &str, value: i64) -> Result<(), DriverError> {
        let mut inner = self.lock();
        inner.check_fail_set(feature)?;
        let device = inner.open_device_index(handle)?;
        let dev = &mut inner.devices[device];
        match feature {
            features::WIDTH => dev.width = value,
            features::HEIGHT => dev.height = value,
            features::GEV_SCPS_PACKET_SIZE => dev.packet_size = value,
            features::GEV_SCPD => dev.packet_delay = value,
            _ => return Err(DriverError::new(status::NOT_SUPPORTED)),
        }
        inner.applied.push(Applied::Int(feature.to_string(), value));
        Ok(())
    }

    fn get_enum(&mut self, handle: Handle, feature: &str) -> Result<EnumValue, DriverError> {
        let inner = self.lock();
        let device = inner.open_device_index(handle)?;
        let dev = &inner.devices[device];
        let current = match feature {
            features::PIXEL_FORMAT => dev.pixel_format.code(),
            features::TRIGGER_MODE => dev.trigger_mode,
            features::ACQUISITION_FRAME_RATE_ENABLE => {
                if dev.frame_rate_enabled {
                    features::SWITCH_ON
                } else {
                    features::SWITCH_OFF
                }
            }
            _ => return Err(DriverError::new(status::NOT_SUPPORTED)),
        };
        Ok(EnumValue { current })
    }

    fn get_float(&mut self, handle: Handle, feature: &str) -> Result<FloatValue, DriverError> {
        let inner = self.lock();
        let device = inner.open_device_index(handle)?;
        let dev = &inner.devices[device];
        let value = match feature {
            features::EXPOSURE_TIME => FloatValue {
                current: dev.exposure_us,
                min: 16.0,
                max: 1_000_000.0,
            },
            features::GAIN => FloatValue {
                current: dev.gain_db,
                min: 0.0,
                max: 24.0,
            },
            features::ACQUISITION_FRAME_RATE | features::RESULTING_FRAME_RATE => FloatValue {
                current: dev.frame_rate_hz,
                min: 0.1,
                max: 500.0,
            },
            _ => return Err(DriverError::new(status::NOT_SUPPORTED)),
        };
        Ok(value)
    }

    fn get_int(&mut self, handle: Handle, feature: &str) -> Result<IntValue, DriverError> {
        let inner = self.lock();
        let device = inner.open_device_index(handle)?;
        let dev = &inner.devices[device];
        let value = match feature {
            features::WIDTH => IntValue {
                current: dev.width,
                min: 64,
                max: 4096,
            },
            features::HEIGHT => IntValue {
                current: dev.height,
                min: 64,
                max: 3072,
            },
            features::GEV_SCPS_PACKET_SIZE => IntValue {
                current: dev.packet_size,
                min: 500,
                max: 9000,
            },
            features::GEV_SCPD => IntValue {
                current: dev.packet_delay,
                min: 0,
                max: 10_000_000,
            },
            features::PAYLOAD_SIZE => {
                let payload = dev.payload_len() as i64;
                IntValue {
                    current: payload,
                    min: payload,
                    max: payload,
                }
            }
            _ => return Err(DriverError::new(status::NOT_SUPPORTED)),
        };
        Ok(value)
    }

    fn send_command(&mut self, handle: Handle, feature: &str) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let device = inner.open_device_index(handle)?;
        match feature {
            features::TRIGGER_SOFTWARE => inner.devices[device].pending_triggers += 1,
            _ => return Err(DriverError::new(status::NOT_SUPPORTED)),
        }
        inner.applied.push(Applied::Command(feature.to_string()));
        Ok(())
    }

    fn start_grabbing(&mut self, handle: Handle) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let state = inner.handle_state(handle)?;
        if !state.open || state.grabbing {
            return Err(DriverError::new(status::CALL_ORDER));
        }
        if let Some(code) = inner.fail_next_start.take() {
            return Err(DriverError::new(code));
        }
        if let Some(s) = inner.handles.get_mut(&handle.as_raw()) {
            s.grabbing = true;
        }
        Ok(())
    }

    fn stop_grabbing(&mut self, handle: Handle) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let state = inner.handle_state(handle)?;
        if !state.open {
            return Err(DriverError::new(status::CALL_ORDER));
        }
        if let Some(s) = inner.handles.get_mut(&handle.as_raw()) {
            s.grabbing = false;
        }
        Ok(())
    }

    fn fetch_frame(&mut self, handle: Handle, timeout: Duration) -> Result<Fetch, DriverError> {
        // Pacing sleeps without the lock so control clones stay responsive.
        let interval = {
            let inner = self.lock();
            let state = inner.handle_state(handle)?;
            if !state.open || !state.grabbing {
                return Err(DriverError::new(status::CALL_ORDER));
            }
            inner.frame_interval
        };
        if !interval.is_zero() {
            if interval > timeout {
                thread::sleep(timeout);
                return Ok(Fetch::NoData);
            }
            thread::sleep(interval);
        }
        let mut inner = self.lock();
        let state = inner.handle_state(handle)?;
        if !state.open || !state.grabbing {
            return Err(DriverError::new(status::CALL_ORDER));
        }
        if let Some(code) = inner.fail_next_fetch.take() {
            return Err(DriverError::new(code));
        }
        if !inner.link_up {
            return Err(DriverError::new(status::LINK_DOWN));
        }
        if inner.queued_no_data > 0 {
            inner.queued_no_data -= 1;
            return Ok(Fetch::NoData);
        }
        if inner.devices[state.device].trigger_mode == features::SWITCH_ON {
            if inner.devices[state.device].pending_triggers == 0 {
                return Ok(Fetch::NoData);
            }
            inner.devices[state.device].pending_triggers -= 1;
        }
        if inner.outstanding.len() >= inner.pool_slots {
            return Err(DriverError::new(status::NO_RESOURCE));
        }
        let dev = &inner.devices[state.device];
        let meta = FrameMeta {
            width: dev.width as u32,
            height: dev.height as u32,
            pixel_format: dev.pixel_format,
            frame_id: inner.frame_counter,
        };
        let data = pattern_payload(meta.frame_id, dev.payload_len());
        inner.frame_counter += 1;
        inner.fetch_count += 1;
        inner.next_token += 1;
        let token_raw = inner.next_token;
        inner.outstanding.insert(token_raw, handle.as_raw());
        Ok(Fetch::Frame(DriverFrame {
            meta,
            data,
            token: FrameToken::new(token_raw),
        }))
    }

    fn release_frame(&mut self, handle: Handle, token: FrameToken) {
        let mut inner = self.lock();
        if inner.outstanding.remove(&token.slot()) == Some(handle.as_raw()) {
            inner.release_count += 1;
        }
    }

    fn convert_pixel_format(
        &mut self,
        handle: Handle,
        src: &[u8],
        src_meta: &FrameMeta,
        dst: &mut [u8],
        dst_format: PixelFormat,
    ) -> Result<usize, DriverError> {
        let mut inner = self.lock();
        inner.open_device_index(handle)?;
        if let Some(code) = inner.fail_next_convert.take() {
            return Err(DriverError::new(code));
        }
        if dst_format != PixelFormat::Bgr8 {
            return Err(DriverError::new(status::NOT_SUPPORTED));
        }
        convert_to_bgr(src, src_meta, dst)
    }
}
