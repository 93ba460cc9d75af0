//! Integration tests for the descriptor probe
//!
//! Drives `find_driver_with` through the blocking pool with a scripted
//! access layer.

use cli::find::{find_driver_with, parse_product_id};
use resolver::test_utils::{FakeUsbAccess, apple_device, fake_device};
use resolver::{AccessError, Outcome, ResolverConfig};
use std::time::Duration;

const PID: u16 = 0x12a8;
const UDID: &str = "00008030001A2D1E0C38802E";

#[tokio::test]
async fn test_attached_device_is_found() {
    let access = FakeUsbAccess::new().with_device(apple_device(1, 4, PID, UDID));
    let outcome = find_driver_with(access, PID, Some(UDID), ResolverConfig::default()).await;
    assert_eq!(outcome, Outcome::MatchFound);
    assert_eq!(outcome.sentinel(), "TRUE");
}

#[tokio::test]
async fn test_wrong_product_id() {
    let access = FakeUsbAccess::new().with_device(apple_device(1, 4, PID, UDID));
    let outcome = find_driver_with(access, PID + 1, Some(UDID), ResolverConfig::default()).await;
    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(outcome.sentinel(), "FALSE");
}

#[tokio::test]
async fn test_without_udid_nothing_is_scanned() {
    let outcome =
        find_driver_with(FakeUsbAccess::poisoned(), PID, None, ResolverConfig::default()).await;
    assert_eq!(outcome, Outcome::NotFound);
}

#[tokio::test]
async fn test_empty_udid_nothing_is_scanned() {
    let outcome =
        find_driver_with(FakeUsbAccess::poisoned(), PID, Some(""), ResolverConfig::default())
            .await;
    assert_eq!(outcome, Outcome::NotFound);
}

#[tokio::test]
async fn test_usb_unavailable() {
    let access = FakeUsbAccess::new()
        .with_device(apple_device(1, 4, PID, UDID))
        .failing_init();
    let outcome = find_driver_with(access, PID, Some(UDID), ResolverConfig::default()).await;
    assert_eq!(outcome, Outcome::NotFound);
}

#[tokio::test]
async fn test_busy_device_is_skipped() {
    let access = FakeUsbAccess::new()
        .with_device(apple_device(1, 2, PID, UDID).open_fails(AccessError::Busy))
        .with_device(apple_device(2, 7, PID, UDID));
    let outcome = find_driver_with(access, PID, Some(UDID), ResolverConfig::default()).await;
    assert_eq!(outcome, Outcome::MatchFound);
}

#[tokio::test]
async fn test_configured_vendor() {
    let config = ResolverConfig {
        vendor_id: 0x1234,
        read_timeout: Duration::from_millis(250),
        ..ResolverConfig::default()
    };

    let access = FakeUsbAccess::new().with_device(fake_device(1, 4, 0x1234, PID, UDID));
    assert_eq!(
        find_driver_with(access, PID, Some(UDID), config).await,
        Outcome::MatchFound
    );

    // An Apple device no longer qualifies
    let access = FakeUsbAccess::new().with_device(apple_device(1, 4, PID, UDID));
    assert_eq!(
        find_driver_with(access, PID, Some(UDID), config).await,
        Outcome::NotFound
    );
}

#[test]
fn test_product_id_forms_agree() {
    assert_eq!(parse_product_id("4776"), parse_product_id("0x12a8"));
}
