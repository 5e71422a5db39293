//! Integration tests for the acquisition loop
//!
//! These tests validate the grab loop against the simulator:
//! - Frame budgets and callback delivery agree with the statistics
//! - A failed grab triggers recovery and the loop resumes, replaying the
//!   session's configuration on the way
//! - Cancellation from another thread stops the loop between frames

#![cfg(feature = "mock-camera")]

mod common;

use camgrab_rs::acquire::{self, AcquireOptions};
use camgrab_rs::driver::mock::Applied;
use camgrab_rs::driver::{features, status};
use camgrab_rs::{CancelToken, TARGET_FORMAT};
use std::thread;
use std::time::Duration;

fn fast_options(max_frames: Option<u64>) -> AcquireOptions {
    AcquireOptions {
        grab_timeout: common::grab_timeout(),
        reconnect: common::fast_policy(),
        max_frames,
        ..Default::default()
    }
}

#[test]
fn test_budget_callback_and_stats_agree() {
    let (_camera, mut session) = common::grabbing_mono_rig();
    let cancel = CancelToken::new();

    let mut seen = 0u64;
    let stats = acquire::run(&mut session, 0, &fast_options(Some(4)), &cancel, |frame| {
        assert_eq!(frame.pixel_format, TARGET_FORMAT);
        seen += 1;
    });

    assert_eq!(seen, 4);
    assert_eq!(stats.frames, 4);
    assert!(session.is_grabbing(), "The loop leaves the session running");
}

#[test]
fn test_loop_recovers_and_replays_configuration() {
    let (camera, mut session) = common::grabbing_mono_rig();
    session.set_exposure_time(5000.0).unwrap();
    camera.clear_applied();
    camera.fail_next_fetch(status::LINK_DOWN);

    let cancel = CancelToken::new();
    let stats = acquire::run(&mut session, 0, &fast_options(Some(3)), &cancel, |_| {});

    assert_eq!(stats.frames, 3);
    assert_eq!(stats.failed_grabs, 1);
    assert!(session.is_grabbing());

    // Recovery reopened the device and replayed the exposure
    assert!(camera
        .applied()
        .contains(&Applied::Float(features::EXPOSURE_TIME.to_string(), 5000.0)));
}

#[test]
fn test_cancellation_from_another_thread() {
    let (_camera, mut session) = common::grabbing_mono_rig();
    let cancel = CancelToken::new();

    let canceller = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(40));
        canceller.cancel();
    });

    // No frame budget: only the token ends this loop
    let stats = acquire::run(&mut session, 0, &fast_options(None), &cancel, |_| {});
    handle.join().unwrap();

    assert!(cancel.is_cancelled());
    assert!(
        stats.frames > 0,
        "The loop should have delivered frames before cancellation"
    );
}

#[test]
fn test_pre_cancelled_token_never_grabs() {
    let (camera, mut session) = common::grabbing_mono_rig();
    let cancel = CancelToken::new();
    cancel.cancel();

    acquire::run(&mut session, 0, &fast_options(None), &cancel, |_| {
        panic!("no frames expected")
    });
    assert_eq!(camera.fetch_count(), 0);
}
