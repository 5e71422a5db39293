//! Common test utilities and helpers

#![cfg(feature = "mock-camera")]
#![allow(dead_code)] // Test utilities may not all be used in every test file

use camgrab_rs::{CameraSession, MockCamera, MockDevice, PixelFormat, ReconnectPolicy};
use std::time::Duration;

/// Sensor used by the standard rigs
pub const SENSOR_WIDTH: u32 = 4;
pub const SENSOR_HEIGHT: u32 = 4;

/// Timeout generous enough for the simulator, short enough for tests
pub fn grab_timeout() -> Duration {
    Duration::from_millis(50)
}

/// Reconnect policy tuned so failure-path tests stay fast
pub fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy::new(3, Duration::from_millis(5))
}

/// One GigE camera with a small monochrome sensor, session still closed
pub fn mono_rig() -> (MockCamera, CameraSession<MockCamera>) {
    rig_with_format(PixelFormat::Mono8)
}

/// Same rig but the device streams BGR directly
pub fn bgr_rig() -> (MockCamera, CameraSession<MockCamera>) {
    rig_with_format(PixelFormat::Bgr8)
}

fn rig_with_format(format: PixelFormat) -> (MockCamera, CameraSession<MockCamera>) {
    let camera = MockCamera::new().with_device(
        MockDevice::gige("SN-1", "TestCam", [10, 0, 0, 2]).with_sensor(
            SENSOR_WIDTH as i64,
            SENSOR_HEIGHT as i64,
            format,
        ),
    );
    let session = CameraSession::new(camera.clone());
    (camera, session)
}

/// Monochrome rig already opened and grabbing
pub fn grabbing_mono_rig() -> (MockCamera, CameraSession<MockCamera>) {
    let (camera, mut session) = mono_rig();
    session.open(0).expect("open should succeed");
    session.start_grabbing().expect("start should succeed");
    (camera, session)
}
