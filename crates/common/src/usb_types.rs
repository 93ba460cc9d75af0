//! USB descriptor types shared by the enumeration layer and its consumers

use std::fmt;

/// Apple's USB vendor id
pub const VID_APPLE: u16 = 0x05ac;

/// The subset of a USB device descriptor the resolver looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsbDeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Index of the serial-number string descriptor (0 = none)
    pub serial_number_index: u8,
}

impl UsbDeviceDescriptor {
    pub fn new(vendor_id: u16, product_id: u16, serial_number_index: u8) -> Self {
        Self {
            vendor_id,
            product_id,
            serial_number_index,
        }
    }

    /// True if the descriptor carries the given vendor and product id
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    pub fn has_serial_number(&self) -> bool {
        self.serial_number_index != 0
    }
}

/// A device as seen during one enumeration pass
///
/// Records are snapshots: they are never refreshed, and the bus/address pair
/// is only meaningful until the device is unplugged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsbDeviceRecord {
    pub bus_number: u8,
    pub address: u8,
    pub descriptor: UsbDeviceDescriptor,
}

impl fmt::Display for UsbDeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bus {:03} Device {:03} {:04x}:{:04x}",
            self.bus_number, self.address, self.descriptor.vendor_id, self.descriptor.product_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_matches() {
        let desc = UsbDeviceDescriptor::new(VID_APPLE, 0x12a8, 3);
        assert!(desc.matches(0x05ac, 0x12a8));
        assert!(!desc.matches(0x05ac, 0x12ab));
        assert!(!desc.matches(0x1234, 0x12a8));
    }

    #[test]
    fn test_product_id_zero_is_a_value() {
        let desc = UsbDeviceDescriptor::new(VID_APPLE, 0, 1);
        assert!(desc.matches(VID_APPLE, 0));
        assert!(!desc.matches(VID_APPLE, 1));
    }

    #[test]
    fn test_serial_index() {
        assert!(UsbDeviceDescriptor::new(VID_APPLE, 1, 3).has_serial_number());
        assert!(!UsbDeviceDescriptor::new(VID_APPLE, 1, 0).has_serial_number());
    }

    #[test]
    fn test_record_display() {
        let record = UsbDeviceRecord {
            bus_number: 2,
            address: 17,
            descriptor: UsbDeviceDescriptor::new(VID_APPLE, 0x12a8, 3),
        };
        assert_eq!(record.to_string(), "Bus 002 Device 017 05ac:12a8");
    }
}
