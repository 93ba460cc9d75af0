//! libusb-backed USB access
//!
//! Wraps a `rusb::Context` and the device list captured by [`UsbAccess::init`].
//! Each call to `init` replaces the snapshot, so nothing is cached between
//! queries that each construct a fresh access object or re-init it.

use crate::access::{AccessError, UsbAccess, truncate_to_boundary};
use common::{UsbDeviceDescriptor, UsbDeviceRecord};
use rusb::{Context, Device, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, warn};

/// USB access through libusb
#[derive(Default)]
pub struct RusbAccess {
    /// Live libusb context (None until `init` succeeds)
    context: Option<Context>,
    /// Devices captured by the last `init`
    devices: Vec<Device<Context>>,
}

impl RusbAccess {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_device(&self, record: &UsbDeviceRecord) -> Option<&Device<Context>> {
        self.devices
            .iter()
            .find(|d| d.bus_number() == record.bus_number && d.address() == record.address)
    }
}

impl UsbAccess for RusbAccess {
    type Handle = DeviceHandle<Context>;

    fn init(&mut self) -> Result<(), AccessError> {
        let context = Context::new().map_err(|e| AccessError::InitFailed(e.to_string()))?;
        let list = context
            .devices()
            .map_err(|e| AccessError::InitFailed(e.to_string()))?;

        self.devices = list.iter().collect();
        self.context = Some(context);

        debug!("Enumerated {} USB devices", self.devices.len());
        Ok(())
    }

    fn list_buses(&mut self) -> Result<Vec<u8>, AccessError> {
        if self.context.is_none() {
            return Err(AccessError::InitFailed("not initialized".to_string()));
        }

        let mut buses: Vec<u8> = Vec::new();
        for device in &self.devices {
            let bus = device.bus_number();
            if !buses.contains(&bus) {
                buses.push(bus);
            }
        }
        Ok(buses)
    }

    fn list_devices(&mut self, bus: u8) -> Result<Vec<UsbDeviceRecord>, AccessError> {
        let mut records = Vec::new();

        for device in self.devices.iter().filter(|d| d.bus_number() == bus) {
            let desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(e) => {
                    warn!(
                        "Failed to read device descriptor (bus={}, addr={}): {}",
                        bus,
                        device.address(),
                        e
                    );
                    continue;
                }
            };

            records.push(UsbDeviceRecord {
                bus_number: bus,
                address: device.address(),
                descriptor: UsbDeviceDescriptor::new(
                    desc.vendor_id(),
                    desc.product_id(),
                    desc.serial_number_string_index().unwrap_or(0),
                ),
            });
        }

        Ok(records)
    }

    fn open(&mut self, record: &UsbDeviceRecord) -> Result<Self::Handle, AccessError> {
        let device = self.find_device(record).ok_or(AccessError::NotFound)?;
        let handle = device.open()?;
        debug!("Opened {}", record);
        Ok(handle)
    }

    fn read_string_descriptor(
        &mut self,
        handle: &mut Self::Handle,
        index: u8,
        max_len: usize,
        timeout: Duration,
    ) -> Result<String, AccessError> {
        if index == 0 {
            return Err(AccessError::NoSerial);
        }

        let with_timeout = |e: rusb::Error| match e {
            rusb::Error::Timeout => AccessError::Timeout(timeout),
            other => AccessError::from(other),
        };

        let languages = handle.read_languages(timeout).map_err(with_timeout)?;
        let value = match languages.first() {
            Some(language) => handle
                .read_string_descriptor(*language, index, timeout)
                .map_err(with_timeout)?,
            // Some firmware has no language table; fall back to the ASCII read.
            // libusb runs that read with its own fixed 1 s timeout, so
            // `timeout` does not apply on this path.
            None => handle.read_string_descriptor_ascii(index)?,
        };

        Ok(truncate_to_boundary(value, max_len))
    }

    fn close(&mut self, handle: Self::Handle) {
        // libusb_close runs when the handle drops
        drop(handle);
        debug!("Closed device handle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_buses_before_init() {
        let mut access = RusbAccess::new();
        assert!(matches!(
            access.list_buses(),
            Err(AccessError::InitFailed(_))
        ));
    }

    #[test]
    fn test_list_devices_before_init_is_empty() {
        let mut access = RusbAccess::new();
        assert_eq!(access.list_devices(1), Ok(Vec::new()));
    }

    #[test]
    fn test_open_unknown_device() {
        let mut access = RusbAccess::new();
        let record = UsbDeviceRecord {
            bus_number: 1,
            address: 1,
            descriptor: UsbDeviceDescriptor::new(0x05ac, 0x12a8, 3),
        };
        assert!(matches!(access.open(&record), Err(AccessError::NotFound)));
    }
}
