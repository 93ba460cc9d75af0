//! Identity resolver
//!
//! Scans the attached USB devices for one whose vendor id, product id and
//! serial-number string all match a query. The scan is best effort:
//!
//! - an access layer that can't start resolves to "not found",
//! - a device that can't be opened or read is skipped,
//! - the first match ends the scan.
//!
//! Serial numbers are compared byte for byte, with no case folding.

use crate::access::{AccessError, UsbAccess};
use crate::enumerator::BusEnumerator;
use common::{UsbDeviceRecord, VID_APPLE};
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound on the serial-number string read from a device, in bytes
pub const MAX_SERIAL_LEN: usize = 100;

/// Per-read timeout for string descriptors
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Resolver tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Vendor id every candidate must carry
    pub vendor_id: u16,
    pub max_serial_len: usize,
    pub read_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            vendor_id: VID_APPLE,
            max_serial_len: MAX_SERIAL_LEN,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// One resolution request
///
/// The vendor filter is not part of the query; it comes from the resolver's
/// [`ResolverConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverQuery {
    pub product_id: u16,
    pub target_identity: String,
}

impl ResolverQuery {
    pub fn new(product_id: u16, target_identity: impl Into<String>) -> Self {
        Self {
            product_id,
            target_identity: target_identity.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    MatchFound,
    NotFound,
}

impl Outcome {
    /// The literal printed by the command-line tool
    pub fn sentinel(self) -> &'static str {
        match self {
            Outcome::MatchFound => "TRUE",
            Outcome::NotFound => "FALSE",
        }
    }
}

/// Why a resolution ended the way it did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    Matched,
    /// Every candidate was checked and none matched
    Exhausted,
    /// The USB access layer could not start; reported as not found
    EnvironmentUnavailable(AccessError),
    /// Empty target identity; no device I/O was done
    EmptyIdentity,
}

/// Counters collected during one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub devices_seen: usize,
    pub candidates: usize,
    /// Candidates that could not be opened or read
    pub skipped: usize,
}

/// The answer to a [`ResolverQuery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    pub matched: Option<UsbDeviceRecord>,
    pub reason: Reason,
    pub stats: ScanStats,
}

impl Resolution {
    fn not_found(reason: Reason, stats: ScanStats) -> Self {
        Self {
            outcome: Outcome::NotFound,
            matched: None,
            reason,
            stats,
        }
    }

    pub fn is_match(&self) -> bool {
        self.outcome == Outcome::MatchFound
    }
}

/// Open device handle that goes back to the access layer on drop
struct OpenDevice<'a, A: UsbAccess> {
    access: &'a mut A,
    handle: Option<A::Handle>,
}

impl<'a, A: UsbAccess> OpenDevice<'a, A> {
    fn open(access: &'a mut A, record: &UsbDeviceRecord) -> Result<Self, AccessError> {
        let handle = access.open(record)?;
        Ok(Self {
            access,
            handle: Some(handle),
        })
    }

    fn read_string(
        &mut self,
        index: u8,
        max_len: usize,
        timeout: Duration,
    ) -> Result<String, AccessError> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| AccessError::Other("handle already closed".to_string()))?;
        self.access
            .read_string_descriptor(handle, index, max_len, timeout)
    }
}

impl<A: UsbAccess> Drop for OpenDevice<'_, A> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.access.close(handle);
        }
    }
}

/// Resolves serial numbers against attached USB devices
pub struct IdentityResolver<A: UsbAccess> {
    access: A,
    config: ResolverConfig,
}

impl<A: UsbAccess> IdentityResolver<A> {
    pub fn new(access: A, config: ResolverConfig) -> Self {
        Self { access, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The underlying access layer
    pub fn access(&self) -> &A {
        &self.access
    }

    /// True if a device with the configured vendor id, `product_id` and
    /// serial number `target_identity` is attached
    pub fn resolve(&mut self, product_id: u16, target_identity: &str) -> bool {
        self.resolve_query(&ResolverQuery::new(product_id, target_identity))
            .is_match()
    }

    /// Run a query against the configured vendor id and report how it was
    /// decided
    pub fn resolve_query(&mut self, query: &ResolverQuery) -> Resolution {
        let mut stats = ScanStats::default();

        if query.target_identity.is_empty() {
            debug!("Empty target identity, not scanning");
            return Resolution::not_found(Reason::EmptyIdentity, stats);
        }

        let mut enumerator = BusEnumerator::start(&mut self.access);
        if let Some(e) = enumerator.unavailable() {
            info!("USB access unavailable, treating as not found: {}", e);
            return Resolution::not_found(Reason::EnvironmentUnavailable(e.clone()), stats);
        }

        while let Some(bus) = enumerator.next_bus(&mut self.access) {
            for record in &bus.devices {
                stats.devices_seen += 1;
                if !record
                    .descriptor
                    .matches(self.config.vendor_id, query.product_id)
                {
                    continue;
                }
                stats.candidates += 1;

                match self.read_serial(record) {
                    Ok(serial) if serial == query.target_identity => {
                        info!("Found {} with serial {}", record, serial);
                        return Resolution {
                            outcome: Outcome::MatchFound,
                            matched: Some(*record),
                            reason: Reason::Matched,
                            stats,
                        };
                    }
                    Ok(serial) => {
                        debug!("{} has serial {}, no match", record, serial);
                    }
                    Err(e) => {
                        debug!("Skipping {}: {}", record, e);
                        stats.skipped += 1;
                    }
                }
            }
        }

        info!(
            "No match for product {:#06x} after {} candidates ({} skipped)",
            query.product_id, stats.candidates, stats.skipped
        );
        Resolution::not_found(Reason::Exhausted, stats)
    }

    fn read_serial(&mut self, record: &UsbDeviceRecord) -> Result<String, AccessError> {
        if !record.descriptor.has_serial_number() {
            return Err(AccessError::NoSerial);
        }

        // The access layer bounds the read to max_serial_len
        let mut device = OpenDevice::open(&mut self.access, record)?;
        device.read_string(
            record.descriptor.serial_number_index,
            self.config.max_serial_len,
            self.config.read_timeout,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeUsbAccess, apple_device, fake_device};

    fn resolver(access: FakeUsbAccess) -> IdentityResolver<FakeUsbAccess> {
        IdentityResolver::new(access, ResolverConfig::default())
    }

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.vendor_id, 0x05ac);
        assert_eq!(config.max_serial_len, 100);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_sentinel() {
        assert_eq!(Outcome::MatchFound.sentinel(), "TRUE");
        assert_eq!(Outcome::NotFound.sentinel(), "FALSE");
    }

    #[test]
    fn test_other_vendor_is_never_opened() {
        let mut r = resolver(
            FakeUsbAccess::new().with_device(fake_device(1, 1, 0x1234, 0x12a8, "ABC123")),
        );
        let resolution = r.resolve_query(&ResolverQuery::new(0x12a8, "ABC123"));

        assert_eq!(resolution.outcome, Outcome::NotFound);
        assert_eq!(resolution.reason, Reason::Exhausted);
        assert_eq!(resolution.stats.devices_seen, 1);
        assert_eq!(resolution.stats.candidates, 0);
        assert!(r.access().open_attempts.is_empty());
    }

    #[test]
    fn test_configured_vendor_is_used() {
        let access =
            FakeUsbAccess::new().with_device(fake_device(1, 1, 0x1234, 0x0001, "SERIAL"));
        let config = ResolverConfig {
            vendor_id: 0x1234,
            ..ResolverConfig::default()
        };
        let mut r = IdentityResolver::new(access, config);
        assert!(r.resolve(0x0001, "SERIAL"));
    }

    #[test]
    fn test_entry_points_agree_on_vendor() {
        let config = ResolverConfig {
            vendor_id: 0x1234,
            ..ResolverConfig::default()
        };
        let mut r = IdentityResolver::new(
            FakeUsbAccess::new()
                .with_device(fake_device(1, 1, 0x1234, 7, "S"))
                .with_device(apple_device(1, 2, 8, "A")),
            config,
        );

        assert!(r.resolve(7, "S"));
        assert!(r.resolve_query(&ResolverQuery::new(7, "S")).is_match());

        // Apple devices are no longer candidates under this config
        assert!(!r.resolve(8, "A"));
        let resolution = r.resolve_query(&ResolverQuery::new(8, "A"));
        assert!(!resolution.is_match());
        assert_eq!(resolution.stats.candidates, 0);
    }

    #[test]
    fn test_device_without_serial_is_skipped_unopened() {
        let mut r = resolver(
            FakeUsbAccess::new()
                .with_device(apple_device(1, 1, 0x12a8, "ABC123").without_serial()),
        );
        let resolution = r.resolve_query(&ResolverQuery::new(0x12a8, "ABC123"));

        assert!(!resolution.is_match());
        assert_eq!(resolution.stats.skipped, 1);
        assert!(r.access().open_attempts.is_empty());
    }

    #[test]
    fn test_handle_closed_after_mismatch() {
        let mut r = resolver(
            FakeUsbAccess::new()
                .with_device(apple_device(1, 1, 0x12a8, "OTHER"))
                .with_device(apple_device(1, 2, 0x12a8, "ANOTHER")),
        );
        assert!(!r.resolve(0x12a8, "ABC123"));
        assert_eq!(r.access().closed, 2);
        assert_eq!(r.access().open_handles, 0);
    }

    #[test]
    fn test_read_failure_still_closes() {
        let mut r = resolver(
            FakeUsbAccess::new().with_device(
                apple_device(1, 1, 0x12a8, "ABC123")
                    .read_fails(AccessError::Timeout(Duration::from_secs(1))),
            ),
        );
        let resolution = r.resolve_query(&ResolverQuery::new(0x12a8, "ABC123"));

        assert!(!resolution.is_match());
        assert_eq!(resolution.stats.skipped, 1);
        assert_eq!(r.access().closed, 1);
        assert_eq!(r.access().open_handles, 0);
    }

    #[test]
    fn test_read_uses_bounds() {
        let config = ResolverConfig {
            read_timeout: Duration::from_millis(250),
            max_serial_len: 6,
            ..ResolverConfig::default()
        };
        let mut r = IdentityResolver::new(
            FakeUsbAccess::new().with_device(apple_device(1, 1, 0x12a8, "ABC123XYZ")),
            config,
        );

        // The serial is cut at six bytes, so the truncated form matches
        assert!(r.resolve(0x12a8, "ABC123"));
        assert_eq!(r.access().last_timeout, Some(Duration::from_millis(250)));
        assert_eq!(r.access().last_max_len, Some(6));
    }

    #[test]
    fn test_each_query_takes_a_fresh_snapshot() {
        let mut r = resolver(FakeUsbAccess::new().with_device(apple_device(1, 1, 0x12a8, "A")));
        assert!(r.resolve(0x12a8, "A"));
        assert!(r.resolve(0x12a8, "A"));
        assert_eq!(r.access().init_calls, 2);
    }
}
