//! Reconnection supervisor
//!
//! Drives a session back from a dead connection to grabbing: force close,
//! back off, reopen, replay the applied configuration, restart streaming.
//! Backoff is linear in the attempt number, so a flapping link gets
//! progressively more slack.

use crate::driver::CameraDriver;
use crate::error::{CamError, Result};
use crate::session::CameraSession;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Default attempt budget
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default first-attempt delay
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// How hard to try before giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts before [`CamError::ReconnectExhausted`]
    pub max_attempts: u32,
    /// Delay before attempt `n` is `base_delay * n`
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Sleep before attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Recover `session` to the grabbing state on the device at `index`
///
/// Each attempt force-closes whatever is left of the old connection, sleeps
/// the policy's backoff, reopens, replays the session's applied parameters
/// and restarts streaming. Returns the attempt number that succeeded. On
/// exhaustion the session is left closed with its parameter store intact,
/// so a later call can pick up where this one gave up.
///
/// Blocks for the whole recovery; callers wanting cancellation run it
/// between grabs where they already observe their token.
pub fn reconnect<D: CameraDriver>(
    session: &mut CameraSession<D>,
    index: usize,
    policy: ReconnectPolicy,
) -> Result<u32> {
    for attempt in 1..=policy.max_attempts {
        session.close();
        let delay = policy.delay_for(attempt);
        info!(
            "Reconnect attempt {}/{} after {:?}",
            attempt, policy.max_attempts, delay
        );
        thread::sleep(delay);
        if let Err(e) = session.open(index) {
            warn!("Reconnect open failed: {}", e);
            continue;
        }
        session.replay_params();
        if let Err(e) = session.start_grabbing() {
            warn!("Reconnect start failed: {}", e);
            session.close();
            continue;
        }
        info!("Reconnected after {} attempt(s)", attempt);
        return Ok(attempt);
    }
    session.close();
    warn!(
        "Giving up after {} reconnect attempt(s)",
        policy.max_attempts
    );
    Err(CamError::ReconnectExhausted {
        attempts: policy.max_attempts,
    })
}
