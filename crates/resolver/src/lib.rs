//! USB device identity resolver
//!
//! Decides whether a device with a given product id and serial number is
//! attached, by reading raw USB descriptors instead of going through usbmuxd
//! and lockdownd. This is a cheap pre-check before an expensive handshake.
//!
//! # Example
//!
//! ```no_run
//! // Is the iPhone with this UDID plugged in?
//! let attached = resolver::resolve(0x12a8, "00008030001A2D3E0C12802E");
//! println!("{}", if attached { "TRUE" } else { "FALSE" });
//! ```

pub mod access;
pub mod enumerator;
pub mod resolver;
pub mod rusb_access;
pub mod test_utils;

pub use access::{AccessError, UsbAccess};
pub use enumerator::BusEnumerator;
pub use resolver::{
    DEFAULT_READ_TIMEOUT, IdentityResolver, MAX_SERIAL_LEN, Outcome, Reason, Resolution,
    ResolverConfig, ResolverQuery, ScanStats,
};
pub use rusb_access::RusbAccess;

/// Resolve against the live USB stack with Apple's vendor id and default limits
///
/// Never fails: an unusable USB stack resolves to `false`.
pub fn resolve(product_id: u16, target_identity: &str) -> bool {
    IdentityResolver::new(RusbAccess::new(), ResolverConfig::default())
        .resolve(product_id, target_identity)
}
