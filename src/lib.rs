//! # camgrab: resilient machine-vision camera acquisition
//!
//! Drives GigE Vision and USB3 Vision cameras through a narrow driver
//! interface: enumerate devices, open a session, program exposure and
//! friends, stream frames, and survive the cable being pulled.
//!
//! ## Architecture
//!
//! - **Driver**: the [`driver::CameraDriver`] trait is the only thing that
//!   touches a vendor SDK; a scriptable simulator ships behind the
//!   `mock-camera` feature
//! - **Session**: [`session::CameraSession`] owns the connection state
//!   machine, the grow-only frame buffers, and the parameter store
//! - **Recovery**: [`reconnect::reconnect`] rebuilds a dead session with
//!   linear backoff and replays every parameter the device had accepted
//! - **Acquisition**: [`acquire::run`] is the blocking grab loop with
//!   cooperative cancellation and throttled statistics logging
//!
//! ## Configuration
//!
//! Acquisition settings are read from `acquire.toml` in the platform config
//! directory under `camgrab`:
//!
//! - **Linux**: `~/.config/camgrab/acquire.toml`
//! - **macOS**: `~/Library/Application Support/camgrab/acquire.toml`
//! - **Windows**: `%APPDATA%\camgrab\acquire.toml`
//!
//! ## Example
//!
//! ```ignore
//! use camgrab_rs::{acquire, AcquireConfig, CameraSession, CancelToken};
//! use camgrab_rs::{MockCamera, MockDevice};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AcquireConfig::load_or_default();
//!
//!     let camera = MockCamera::new()
//!         .with_device(MockDevice::gige("SN-0001", "SimCam", [192, 168, 1, 64]));
//!     let mut session = CameraSession::new(camera);
//!
//!     session.open(config.camera.index)?;
//!     config.apply_to(&mut session);
//!     session.start_grabbing()?;
//!
//!     let cancel = CancelToken::new();
//!     let stats = acquire::run(&mut session, 0, &config.to_options(), &cancel, |frame| {
//!         println!("frame {}: {}x{}", frame.frame_id, frame.width, frame.height);
//!     });
//!     println!("{} frame(s) delivered", stats.frames);
//!     Ok(())
//! }
//! ```

pub mod acquire;
pub mod buffer;
pub mod config;
pub mod directory;
pub mod driver;
pub mod error;
pub mod params;
pub mod reconnect;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::AcquireConfig;
pub use directory::DeviceDescriptor;
pub use driver::{CameraDriver, DriverError, Handle};
pub use error::{CamError, Result};
pub use params::ParamStore;
pub use reconnect::{reconnect, ReconnectPolicy};
pub use session::{CameraSession, GrabStats, SessionState, TARGET_FORMAT};
pub use types::{CancelToken, FrameView, Grab, PixelFormat, TransportKind, TransportMask};

#[cfg(feature = "mock-camera")]
pub use driver::mock::{MockCamera, MockDevice};
