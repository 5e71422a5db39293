//! Device directory: discovery and serial-number lookup
//!
//! A thin layer over driver enumeration that decodes raw device records into
//! display-ready descriptors. Results are always a fresh snapshot; indices
//! are only meaningful against the enumeration that produced them.

use crate::driver::{CameraDriver, RawDeviceInfo};
use crate::types::{TransportKind, TransportMask};
use std::fmt;
use tracing::{debug, warn};

/// One camera visible on the network or the USB bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Transport the device answered on
    pub transport: TransportKind,
    /// Manufacturer serial number
    pub serial: String,
    /// Model name
    pub model: String,
    /// Dotted-quad IPv4 address, or `"USB"` for USB devices
    pub address: String,
}

impl DeviceDescriptor {
    pub(crate) fn from_raw(raw: &RawDeviceInfo) -> Self {
        let address = match raw.packed_ip {
            Some(packed) => {
                let [a, b, c, d] = packed.to_be_bytes();
                format!("{}.{}.{}.{}", a, b, c, d)
            }
            None => "USB".to_string(),
        };
        Self {
            transport: raw.transport,
            serial: raw.serial.clone(),
            model: raw.model.clone(),
            address,
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) @ {}",
            self.transport, self.model, self.serial, self.address
        )
    }
}

/// List devices on the selected transports
///
/// A failed driver query is logged and reported as no devices; an empty bus
/// is a normal outcome, not an error.
pub fn enumerate<D: CameraDriver>(driver: &mut D, transports: TransportMask) -> Vec<DeviceDescriptor> {
    match driver.enumerate(transports) {
        Ok(raw) => {
            debug!("Enumeration found {} device(s)", raw.len());
            raw.iter().map(DeviceDescriptor::from_raw).collect()
        }
        Err(e) => {
            warn!("Device enumeration failed: {}", e);
            Vec::new()
        }
    }
}

/// Find a device by exact serial number, searching all transports
///
/// Runs a fresh enumeration and returns the index of the first match, which
/// is only valid against an equally fresh enumeration. Matching is
/// case-sensitive.
pub fn find_by_serial<D: CameraDriver>(driver: &mut D, serial: &str) -> Option<usize> {
    enumerate(driver, TransportMask::ALL)
        .iter()
        .position(|d| d.serial == serial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverError, MockCameraDriver};

    fn raw_gige(serial: &str) -> RawDeviceInfo {
        RawDeviceInfo {
            transport: TransportKind::GigE,
            serial: serial.to_string(),
            model: "TestCam".to_string(),
            packed_ip: Some(u32::from_be_bytes([192, 168, 1, 64])),
        }
    }

    #[test]
    fn test_descriptor_decodes_gige_address() {
        let descriptor = DeviceDescriptor::from_raw(&raw_gige("SN-1"));
        assert_eq!(descriptor.address, "192.168.1.64");
        assert_eq!(
            descriptor.to_string(),
            "[GigE] TestCam (SN-1) @ 192.168.1.64"
        );
    }

    #[test]
    fn test_descriptor_marks_usb_address() {
        let raw = RawDeviceInfo {
            transport: TransportKind::Usb,
            serial: "SN-2".to_string(),
            model: "UsbCam".to_string(),
            packed_ip: None,
        };
        let descriptor = DeviceDescriptor::from_raw(&raw);
        assert_eq!(descriptor.address, "USB");
    }

    #[test]
    fn test_enumerate_swallows_driver_failure() {
        let mut driver = MockCameraDriver::new();
        driver
            .expect_enumerate()
            .returning(|_| Err(DriverError::new(0x8000_0012)));
        assert!(enumerate(&mut driver, TransportMask::ALL).is_empty());
    }

    #[test]
    fn test_find_by_serial_is_exact_and_first() {
        let mut driver = MockCameraDriver::new();
        driver.expect_enumerate().returning(|_| {
            Ok(vec![raw_gige("SN-10"), raw_gige("SN-2"), raw_gige("SN-2")])
        });
        assert_eq!(find_by_serial(&mut driver, "SN-2"), Some(1));
        assert_eq!(find_by_serial(&mut driver, "sn-2"), None);
        assert_eq!(find_by_serial(&mut driver, "SN-1"), None);
    }
}
