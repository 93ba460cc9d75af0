//! Test utilities for the resolver
//!
//! Provides a scripted [`UsbAccess`] implementation with failure injection and
//! call counters, so resolver behavior can be checked without hardware.
//!
//! # Example
//!
//! ```
//! use resolver::test_utils::{FakeUsbAccess, apple_device};
//! use resolver::{IdentityResolver, ResolverConfig};
//!
//! let access = FakeUsbAccess::new().with_device(apple_device(1, 4, 0x12a8, "ABC123"));
//! let mut resolver = IdentityResolver::new(access, ResolverConfig::default());
//! assert!(resolver.resolve(0x12a8, "ABC123"));
//! assert_eq!(resolver.access().closed, 1);
//! ```

use crate::access::{AccessError, UsbAccess, truncate_to_boundary};
use common::{UsbDeviceDescriptor, UsbDeviceRecord, VID_APPLE};
use std::time::Duration;

/// Serial-number descriptor index used by the builders
pub const FAKE_SERIAL_INDEX: u8 = 3;

/// A scripted device
#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub record: UsbDeviceRecord,
    pub serial: Option<String>,
    pub open_error: Option<AccessError>,
    pub read_error: Option<AccessError>,
}

impl FakeDevice {
    /// Make `open` fail with the given error
    pub fn open_fails(mut self, error: AccessError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Make the serial-number read fail with the given error
    pub fn read_fails(mut self, error: AccessError) -> Self {
        self.read_error = Some(error);
        self
    }

    /// Drop the serial-number descriptor (index 0)
    pub fn without_serial(mut self) -> Self {
        self.record.descriptor.serial_number_index = 0;
        self.serial = None;
        self
    }
}

/// Create a scripted device with an arbitrary vendor id
pub fn fake_device(
    bus_number: u8,
    address: u8,
    vendor_id: u16,
    product_id: u16,
    serial: &str,
) -> FakeDevice {
    FakeDevice {
        record: UsbDeviceRecord {
            bus_number,
            address,
            descriptor: UsbDeviceDescriptor::new(vendor_id, product_id, FAKE_SERIAL_INDEX),
        },
        serial: Some(serial.to_string()),
        open_error: None,
        read_error: None,
    }
}

/// Create a scripted Apple device
pub fn apple_device(bus_number: u8, address: u8, product_id: u16, serial: &str) -> FakeDevice {
    fake_device(bus_number, address, VID_APPLE, product_id, serial)
}

/// Handle returned by [`FakeUsbAccess::open`]
#[derive(Debug)]
pub struct FakeHandle {
    index: usize,
}

/// Scripted USB access with call counters
#[derive(Debug, Default)]
pub struct FakeUsbAccess {
    devices: Vec<FakeDevice>,
    init_error: Option<AccessError>,
    failing_buses: Vec<u8>,
    /// Panic on any call; for paths that must not touch hardware
    poisoned: bool,

    pub init_calls: usize,
    pub list_device_calls: usize,
    /// (bus, address) of every open attempt, in order
    pub open_attempts: Vec<(u8, u8)>,
    pub reads: usize,
    pub closed: usize,
    /// Handles opened and not yet closed
    pub open_handles: usize,
    pub last_timeout: Option<Duration>,
    pub last_max_len: Option<usize>,
}

impl FakeUsbAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// An access layer that panics if the resolver touches it
    pub fn poisoned() -> Self {
        Self {
            poisoned: true,
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device: FakeDevice) -> Self {
        self.devices.push(device);
        self
    }

    /// Make `init` fail as if no USB driver were installed
    pub fn failing_init(mut self) -> Self {
        self.init_error = Some(AccessError::InitFailed("no driver support".to_string()));
        self
    }

    /// Make listing one bus fail
    pub fn failing_bus(mut self, bus: u8) -> Self {
        self.failing_buses.push(bus);
        self
    }

    fn check_poison(&self, op: &str) {
        if self.poisoned {
            panic!("unexpected USB access: {op}");
        }
    }
}

impl UsbAccess for FakeUsbAccess {
    type Handle = FakeHandle;

    fn init(&mut self) -> Result<(), AccessError> {
        self.check_poison("init");
        self.init_calls += 1;
        match &self.init_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn list_buses(&mut self) -> Result<Vec<u8>, AccessError> {
        self.check_poison("list_buses");
        let mut buses = Vec::new();
        for device in &self.devices {
            if !buses.contains(&device.record.bus_number) {
                buses.push(device.record.bus_number);
            }
        }
        Ok(buses)
    }

    fn list_devices(&mut self, bus: u8) -> Result<Vec<UsbDeviceRecord>, AccessError> {
        self.check_poison("list_devices");
        self.list_device_calls += 1;
        if self.failing_buses.contains(&bus) {
            return Err(AccessError::Other(format!("bus {bus} unreadable")));
        }
        Ok(self
            .devices
            .iter()
            .filter(|d| d.record.bus_number == bus)
            .map(|d| d.record)
            .collect())
    }

    fn open(&mut self, device: &UsbDeviceRecord) -> Result<Self::Handle, AccessError> {
        self.check_poison("open");
        self.open_attempts.push((device.bus_number, device.address));

        let index = self
            .devices
            .iter()
            .position(|d| {
                d.record.bus_number == device.bus_number && d.record.address == device.address
            })
            .ok_or(AccessError::NotFound)?;

        if let Some(e) = &self.devices[index].open_error {
            return Err(e.clone());
        }

        self.open_handles += 1;
        Ok(FakeHandle { index })
    }

    fn read_string_descriptor(
        &mut self,
        handle: &mut Self::Handle,
        index: u8,
        max_len: usize,
        timeout: Duration,
    ) -> Result<String, AccessError> {
        self.check_poison("read_string_descriptor");
        self.reads += 1;
        self.last_timeout = Some(timeout);
        self.last_max_len = Some(max_len);

        let device = &self.devices[handle.index];
        if let Some(e) = &device.read_error {
            return Err(e.clone());
        }
        if index == 0 || index != device.record.descriptor.serial_number_index {
            return Err(AccessError::NoSerial);
        }
        let serial = device.serial.clone().ok_or(AccessError::NoSerial)?;
        Ok(truncate_to_boundary(serial, max_len))
    }

    fn close(&mut self, _handle: Self::Handle) {
        self.check_poison("close");
        self.closed += 1;
        self.open_handles -= 1;
    }
}
