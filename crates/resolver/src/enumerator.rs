//! Bus enumeration
//!
//! [`BusEnumerator`] walks the buses reported by a [`UsbAccess`] one at a time.
//! It does not borrow the access layer between steps, so the caller is free to
//! open devices while the walk is in progress.

use crate::access::{AccessError, UsbAccess};
use common::UsbDeviceRecord;
use tracing::{debug, warn};

/// The devices found on one bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusDevices {
    pub bus_number: u8,
    pub devices: Vec<UsbDeviceRecord>,
}

/// One-shot walk over the attached buses
///
/// Built from a fresh snapshot every time; it cannot be rewound.
pub struct BusEnumerator {
    buses: std::vec::IntoIter<u8>,
    /// Why the access layer could not be used, if it couldn't
    unavailable: Option<AccessError>,
}

impl BusEnumerator {
    /// Initialize the access layer and capture the bus list
    ///
    /// An access layer that fails to come up yields an enumerator with no
    /// buses; the failure is kept for [`BusEnumerator::unavailable`].
    pub fn start<A: UsbAccess>(access: &mut A) -> Self {
        let buses = access.init().and_then(|()| access.list_buses());

        match buses {
            Ok(buses) => {
                debug!("Enumerating {} USB buses", buses.len());
                Self {
                    buses: buses.into_iter(),
                    unavailable: None,
                }
            }
            Err(e) => {
                warn!("USB enumeration unavailable: {}", e);
                Self {
                    buses: Vec::new().into_iter(),
                    unavailable: Some(e),
                }
            }
        }
    }

    /// The init failure, if the access layer was unusable
    pub fn unavailable(&self) -> Option<&AccessError> {
        self.unavailable.as_ref()
    }

    /// Devices on the next bus, or None once every bus has been visited
    ///
    /// A bus whose device list can't be read is skipped.
    pub fn next_bus<A: UsbAccess>(&mut self, access: &mut A) -> Option<BusDevices> {
        for bus_number in self.buses.by_ref() {
            match access.list_devices(bus_number) {
                Ok(devices) => {
                    return Some(BusDevices {
                        bus_number,
                        devices,
                    });
                }
                Err(e) => {
                    warn!("Skipping bus {:03}: {}", bus_number, e);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeUsbAccess, apple_device};

    #[test]
    fn test_walks_buses_in_order() {
        let mut access = FakeUsbAccess::new()
            .with_device(apple_device(2, 1, 0x12a8, "B"))
            .with_device(apple_device(1, 1, 0x12a8, "A"))
            .with_device(apple_device(2, 2, 0x12a8, "C"));

        let mut enumerator = BusEnumerator::start(&mut access);
        let first = enumerator.next_bus(&mut access).unwrap();
        assert_eq!(first.bus_number, 2);
        assert_eq!(first.devices.len(), 2);

        let second = enumerator.next_bus(&mut access).unwrap();
        assert_eq!(second.bus_number, 1);
        assert!(enumerator.next_bus(&mut access).is_none());
        // Not restartable
        assert!(enumerator.next_bus(&mut access).is_none());
    }

    #[test]
    fn test_init_failure_yields_nothing() {
        let mut access = FakeUsbAccess::new()
            .with_device(apple_device(1, 1, 0x12a8, "A"))
            .failing_init();

        let mut enumerator = BusEnumerator::start(&mut access);
        assert!(matches!(
            enumerator.unavailable(),
            Some(AccessError::InitFailed(_))
        ));
        assert!(enumerator.next_bus(&mut access).is_none());
        assert_eq!(access.list_device_calls, 0);
    }

    #[test]
    fn test_unreadable_bus_is_skipped() {
        let mut access = FakeUsbAccess::new()
            .with_device(apple_device(1, 1, 0x12a8, "A"))
            .with_device(apple_device(3, 1, 0x12a8, "B"))
            .failing_bus(1);

        let mut enumerator = BusEnumerator::start(&mut access);
        let bus = enumerator.next_bus(&mut access).unwrap();
        assert_eq!(bus.bus_number, 3);
        assert_eq!(bus.devices.len(), 1);
        assert!(enumerator.next_bus(&mut access).is_none());
    }
}
