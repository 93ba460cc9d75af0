//! USB access layer seam
//!
//! The resolver never talks to libusb directly. It goes through [`UsbAccess`],
//! which mirrors the handful of operations the scan needs. The production
//! implementation is [`crate::RusbAccess`]; tests script a fake.

use common::UsbDeviceRecord;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a USB access layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The access layer could not start (no driver, no permissions on the bus)
    #[error("USB access layer unavailable: {0}")]
    InitFailed(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("Device busy")]
    Busy,

    /// The device disappeared between enumeration and open
    #[error("Device not found")]
    NotFound,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The device has no serial-number string descriptor
    #[error("No serial number descriptor")]
    NoSerial,

    #[error("USB error: {0}")]
    Other(String),
}

impl From<rusb::Error> for AccessError {
    fn from(e: rusb::Error) -> Self {
        match e {
            rusb::Error::Access => AccessError::AccessDenied,
            rusb::Error::Busy => AccessError::Busy,
            rusb::Error::NoDevice | rusb::Error::NotFound => AccessError::NotFound,
            // rusb doesn't carry the duration; callers that know it rewrap
            rusb::Error::Timeout => AccessError::Timeout(Duration::ZERO),
            other => AccessError::Other(other.to_string()),
        }
    }
}

/// Minimal USB access operations used by the bus enumerator and resolver
///
/// Implementations are used from a single thread for the duration of one
/// query. Every handle returned by [`UsbAccess::open`] is passed back to
/// [`UsbAccess::close`] exactly once.
pub trait UsbAccess {
    /// Open device handle type
    type Handle;

    /// Bring up the access layer and take a fresh snapshot of the bus
    fn init(&mut self) -> Result<(), AccessError>;

    /// Bus numbers in the order the platform reports them
    fn list_buses(&mut self) -> Result<Vec<u8>, AccessError>;

    /// Devices on one bus, in platform order
    fn list_devices(&mut self, bus: u8) -> Result<Vec<UsbDeviceRecord>, AccessError>;

    fn open(&mut self, device: &UsbDeviceRecord) -> Result<Self::Handle, AccessError>;

    /// Read a string descriptor, returning at most `max_len` bytes cut on a
    /// character boundary (see [`truncate_to_boundary`])
    fn read_string_descriptor(
        &mut self,
        handle: &mut Self::Handle,
        index: u8,
        max_len: usize,
        timeout: Duration,
    ) -> Result<String, AccessError>;

    fn close(&mut self, handle: Self::Handle);
}

/// Cut `s` down to at most `max_len` bytes without splitting a character
pub fn truncate_to_boundary(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
