//! Continuous acquisition loop
//!
//! Pulls converted frames out of a session, hands them to a callback, and
//! when a grab fails drives the reconnection supervisor until the camera is
//! back. Cancellation is observed between frames; a grab in flight finishes
//! first.

use crate::driver::CameraDriver;
use crate::reconnect::{self, ReconnectPolicy};
use crate::session::{CameraSession, GrabStats};
use crate::types::{CancelToken, FrameView, Grab};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Default per-grab timeout
pub const DEFAULT_GRAB_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default interval between throughput log lines
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Breather after an exhausted recovery before trying again
const EXHAUSTED_PAUSE: Duration = Duration::from_millis(100);

/// Tuning for [`run`]
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    /// How long each grab waits for a frame
    pub grab_timeout: Duration,
    /// Recovery behavior when a grab fails
    pub reconnect: ReconnectPolicy,
    /// How often to log running statistics
    pub stats_interval: Duration,
    /// Stop after this many delivered frames; `None` runs until cancelled
    pub max_frames: Option<u64>,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            grab_timeout: DEFAULT_GRAB_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
            stats_interval: DEFAULT_STATS_INTERVAL,
            max_frames: None,
        }
    }
}

/// Grab frames until cancelled or the frame budget is spent
///
/// `index` names the device to reconnect to, normally the one the session
/// was opened at. Empty grabs are quietly skipped. A failed grab triggers
/// recovery; if that exhausts its attempts the loop pauses briefly and
/// tries again on the next turn, so a camera that comes back minutes later
/// is still picked up. Returns a snapshot of the session's counters.
pub fn run<D, F>(
    session: &mut CameraSession<D>,
    index: usize,
    options: &AcquireOptions,
    cancel: &CancelToken,
    mut on_frame: F,
) -> GrabStats
where
    D: CameraDriver,
    F: FnMut(&FrameView<'_>),
{
    let mut delivered = 0u64;
    let mut last_report = Instant::now();
    while !cancel.is_cancelled() {
        if let Some(max) = options.max_frames {
            if delivered >= max {
                break;
            }
        }
        let grabbed = match session.grab_converted(options.grab_timeout) {
            Ok(Grab::Frame(frame)) => {
                delivered += 1;
                on_frame(&frame);
                true
            }
            Ok(Grab::Empty) => {
                trace!("No frame within {:?}", options.grab_timeout);
                true
            }
            Err(e) => {
                warn!("Grab failed: {}", e);
                false
            }
        };
        if !grabbed {
            match reconnect::reconnect(session, index, options.reconnect) {
                Ok(attempt) => debug!("Recovered on attempt {}", attempt),
                Err(e) => {
                    error!("Recovery failed: {}", e);
                    thread::sleep(EXHAUSTED_PAUSE);
                }
            }
        }
        if last_report.elapsed() >= options.stats_interval {
            let stats = session.stats();
            info!(
                "{} frame(s), {} empty, {} failed, avg {} us/frame, {:.1}% success",
                stats.frames,
                stats.empty_grabs,
                stats.failed_grabs,
                stats.avg_grab_time_us(),
                stats.success_rate() * 100.0
            );
            last_report = Instant::now();
        }
    }
    session.stats().clone()
}

#[cfg(all(test, feature = "mock-camera"))]
mod tests {
    use super::*;
    use crate::driver::mock::{MockCamera, MockDevice};
    use crate::types::PixelFormat;

    fn grabbing_session() -> (MockCamera, CameraSession<MockCamera>) {
        let cam = MockCamera::new().with_device(
            MockDevice::gige("SN-1", "TestCam", [10, 0, 0, 2]).with_sensor(
                4,
                4,
                PixelFormat::Mono8,
            ),
        );
        let mut session = CameraSession::new(cam.clone());
        session.open(0).unwrap();
        session.start_grabbing().unwrap();
        (cam, session)
    }

    fn fast_options() -> AcquireOptions {
        AcquireOptions {
            grab_timeout: Duration::from_millis(10),
            reconnect: ReconnectPolicy::new(3, Duration::from_millis(1)),
            ..Default::default()
        }
    }

    #[test]
    fn test_frame_budget_stops_the_loop() {
        let (_cam, mut session) = grabbing_session();
        let options = AcquireOptions {
            max_frames: Some(3),
            ..fast_options()
        };
        let mut seen = 0u64;
        let cancel = CancelToken::new();
        let stats = run(&mut session, 0, &options, &cancel, |_| seen += 1);
        assert_eq!(seen, 3);
        assert_eq!(stats.frames, 3);
        assert!(session.is_grabbing());
    }

    #[test]
    fn test_cancellation_is_observed_between_frames() {
        let (_cam, mut session) = grabbing_session();
        let cancel = CancelToken::new();
        let mut seen = 0u64;
        let stats = run(&mut session, 0, &fast_options(), &cancel, |_| {
            seen += 1;
            if seen == 2 {
                cancel.cancel();
            }
        });
        assert_eq!(seen, 2);
        assert_eq!(stats.frames, 2);
    }

    #[test]
    fn test_cancelled_token_prevents_any_grab() {
        let (cam, mut session) = grabbing_session();
        let cancel = CancelToken::new();
        cancel.cancel();
        run(&mut session, 0, &fast_options(), &cancel, |_| {
            panic!("no frame expected")
        });
        assert_eq!(cam.fetch_count(), 0);
    }

    #[test]
    fn test_failed_grab_triggers_recovery() {
        let (cam, mut session) = grabbing_session();
        cam.fail_next_fetch(crate::driver::status::LINK_DOWN);
        let options = AcquireOptions {
            max_frames: Some(2),
            ..fast_options()
        };
        let cancel = CancelToken::new();
        let stats = run(&mut session, 0, &options, &cancel, |_| {});
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.failed_grabs, 1);
        assert!(session.is_grabbing());
    }
}
