//! Integration tests for raw and converted frame retrieval
//!
//! These tests validate the two grab paths end to end:
//! - Wire-format delivery and the fixed BGR conversion target
//! - The direct-copy fast path when no conversion is needed
//! - Driver pool accounting: every fetched frame is released, even on
//!   conversion failure
//! - Empty grabs as a non-error outcome

#![cfg(feature = "mock-camera")]

mod common;

use camgrab_rs::driver::mock::pattern_payload;
use camgrab_rs::driver::status;
use camgrab_rs::{CamError, Grab, PixelFormat, TARGET_FORMAT};

const PIXELS: usize = (common::SENSOR_WIDTH * common::SENSOR_HEIGHT) as usize;

#[test]
fn test_raw_grab_delivers_the_wire_format() {
    let (camera, mut session) = common::grabbing_mono_rig();

    let grab = session.grab_raw(common::grab_timeout()).unwrap();
    let frame = grab.frame().expect("simulator should deliver a frame");
    assert_eq!(frame.width, common::SENSOR_WIDTH);
    assert_eq!(frame.height, common::SENSOR_HEIGHT);
    assert_eq!(frame.pixel_format, PixelFormat::Mono8);
    assert_eq!(frame.len(), PIXELS);
    assert_eq!(frame.data, pattern_payload(0, PIXELS).as_slice());

    assert_eq!(
        camera.outstanding_frames(),
        0,
        "The pool slot must be returned before the grab call returns"
    );
}

#[test]
fn test_converted_output_is_always_target_sized() {
    let (_camera, mut session) = common::grabbing_mono_rig();

    let grab = session.grab_converted(common::grab_timeout()).unwrap();
    let frame = grab.frame().expect("simulator should deliver a frame");
    assert_eq!(frame.pixel_format, TARGET_FORMAT);
    assert_eq!(frame.len(), PIXELS * 3);

    // The simulator expands mono to grey BGR; spot-check one pixel
    let source = pattern_payload(0, PIXELS);
    assert_eq!(&frame.data[0..3], &[source[0], source[0], source[0]]);
}

#[test]
fn test_fast_path_copies_bytes_verbatim() {
    let (camera, mut session) = common::bgr_rig();
    session.open(0).unwrap();
    session.start_grabbing().unwrap();

    let grab = session.grab_converted(common::grab_timeout()).unwrap();
    let frame = grab.frame().expect("simulator should deliver a frame");
    assert_eq!(frame.len(), PIXELS * 3);
    assert_eq!(frame.data, pattern_payload(0, PIXELS * 3).as_slice());

    assert_eq!(camera.fetch_count(), 1);
    assert_eq!(camera.release_count(), 1);
}

#[test]
fn test_conversion_failure_still_releases_the_frame() {
    let (camera, mut session) = common::grabbing_mono_rig();
    camera.fail_next_convert(status::CONVERT_FAILED);

    let err = session.grab_converted(common::grab_timeout()).unwrap_err();
    assert_eq!(err.driver_status(), Some(status::CONVERT_FAILED));
    assert_eq!(
        camera.outstanding_frames(),
        0,
        "A failed conversion must not strand the pool slot"
    );
    assert_eq!(camera.release_count(), 1);

    // The stream keeps working afterwards
    let grab = session.grab_converted(common::grab_timeout()).unwrap();
    assert!(!grab.is_empty());
}

#[test]
fn test_no_data_is_empty_not_error() {
    let (camera, mut session) = common::grabbing_mono_rig();
    camera.queue_no_data(2);

    assert!(session.grab_raw(common::grab_timeout()).unwrap().is_empty());
    assert!(session
        .grab_converted(common::grab_timeout())
        .unwrap()
        .is_empty());
    assert_eq!(session.stats().empty_grabs, 2);
    assert_eq!(session.stats().failed_grabs, 0);

    // Frames resume once the device has data again
    assert!(!session.grab_raw(common::grab_timeout()).unwrap().is_empty());
}

#[test]
fn test_grab_without_start_is_a_precondition_error() {
    let (_camera, mut session) = common::mono_rig();
    session.open(0).unwrap();

    let err = session.grab_raw(common::grab_timeout()).unwrap_err();
    assert!(matches!(err, CamError::NotGrabbing));
    assert!(err.is_precondition());
}

#[test]
fn test_each_grab_yields_a_fresh_frame() {
    let (_camera, mut session) = common::grabbing_mono_rig();

    let first = {
        let grab = session.grab_raw(common::grab_timeout()).unwrap();
        grab.frame().unwrap().data.to_vec()
    };
    let grab = session.grab_raw(common::grab_timeout()).unwrap();
    let second = grab.frame().unwrap();
    assert_eq!(second.frame_id, 1);
    assert_ne!(
        second.data,
        first.as_slice(),
        "Consecutive frames should carry different payloads"
    );
}

#[test]
fn test_sensor_resize_grows_output_and_keeps_working() {
    let (camera, mut session) = common::grabbing_mono_rig();

    let small = session.grab_converted(common::grab_timeout()).unwrap();
    assert_eq!(small.frame().unwrap().len(), PIXELS * 3);

    // Larger frames force the conversion buffer to grow
    camera.resize_sensor(0, 8, 8);
    let grown = session.grab_converted(common::grab_timeout()).unwrap();
    assert_eq!(grown.frame().unwrap().len(), 8 * 8 * 3);

    // Smaller frames after growth still come out exactly sized
    camera.resize_sensor(0, 2, 2);
    let shrunk = session.grab_converted(common::grab_timeout()).unwrap();
    assert_eq!(shrunk.frame().unwrap().len(), 2 * 2 * 3);
}

#[test]
fn test_stats_track_grab_activity() {
    let (camera, mut session) = common::grabbing_mono_rig();

    session.grab_converted(common::grab_timeout()).unwrap();
    session.grab_converted(common::grab_timeout()).unwrap();
    camera.queue_no_data(1);
    session.grab_raw(common::grab_timeout()).unwrap();
    camera.fail_next_fetch(status::LINK_DOWN);
    session.grab_raw(common::grab_timeout()).unwrap_err();

    let stats = session.stats();
    assert_eq!(stats.frames, 2);
    assert_eq!(stats.empty_grabs, 1);
    assert_eq!(stats.failed_grabs, 1);
    assert_eq!(stats.total_bytes, (PIXELS * 3 * 2) as u64);
    assert!((stats.success_rate() - 2.0 / 3.0).abs() < 1e-9);

    session.reset_stats();
    assert_eq!(session.stats().frames, 0);
}
