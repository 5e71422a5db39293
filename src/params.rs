//! Last-applied acquisition parameters
//!
//! The store remembers what the operator configured so the reconnection
//! supervisor can replay it onto a freshly reopened device. It lives in
//! memory only; nothing here survives the process.

use crate::types::PixelFormat;

/// The last successfully applied acquisition parameters
///
/// `None` means "never configured, leave the device at its default" - those
/// values are skipped during replay. The trigger flag has no unset state:
/// `false` is a real configuration (continuous acquisition) and is always
/// replayed.
///
/// Only the session's setters mutate this, and only after the driver accepted
/// the value, so a failed set never clobbers the last known-good value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamStore {
    /// Exposure time in microseconds
    pub exposure_us: Option<f64>,
    /// Analog gain in dB
    pub gain_db: Option<f64>,
    /// Acquisition frame rate in Hz
    pub frame_rate_hz: Option<f64>,
    /// Pixel format delivered by the sensor
    pub pixel_format: Option<PixelFormat>,
    /// Hardware/software trigger enabled
    pub trigger_enabled: bool,
}

impl ParamStore {
    /// Create an empty store (everything at device defaults)
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parameters that would be replayed besides the trigger flag
    pub fn configured_count(&self) -> usize {
        self.exposure_us.is_some() as usize
            + self.gain_db.is_some() as usize
            + self.frame_rate_hz.is_some() as usize
            + self.pixel_format.is_some() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_unconfigured() {
        let store = ParamStore::new();
        assert_eq!(store.exposure_us, None);
        assert_eq!(store.gain_db, None);
        assert_eq!(store.frame_rate_hz, None);
        assert_eq!(store.pixel_format, None);
        assert!(!store.trigger_enabled);
        assert_eq!(store.configured_count(), 0);
    }

    #[test]
    fn test_configured_count_ignores_trigger() {
        let store = ParamStore {
            exposure_us: Some(5000.0),
            pixel_format: Some(PixelFormat::BayerBG8),
            trigger_enabled: true,
            ..ParamStore::default()
        };
        assert_eq!(store.configured_count(), 2);
    }
}
