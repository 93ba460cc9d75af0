//! Descriptor probe (`--find`)
//!
//! Answers "is the device with this UDID attached with this product id?"
//! straight from the USB descriptors, without usbmuxd or lockdownd.

use resolver::{
    IdentityResolver, Outcome, Reason, ResolverConfig, ResolverQuery, RusbAccess, UsbAccess,
};
use tracing::{debug, error};

/// Parse a product id given as decimal or `0x` hex
pub fn parse_product_id(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid product id '{}': {}", s, e))
}

/// Run the probe against the live USB stack
pub async fn find_driver(product_id: u16, udid: Option<&str>, config: ResolverConfig) -> Outcome {
    find_driver_with(RusbAccess::new(), product_id, udid, config).await
}

/// Run the probe against the given access layer on the blocking pool
///
/// Without a UDID nothing is scanned and the answer is [`Outcome::NotFound`].
pub async fn find_driver_with<A>(
    access: A,
    product_id: u16,
    udid: Option<&str>,
    config: ResolverConfig,
) -> Outcome
where
    A: UsbAccess + Send + 'static,
{
    let Some(udid) = udid else {
        debug!("No UDID given, nothing to look for");
        return Outcome::NotFound;
    };

    let query = ResolverQuery::new(product_id, udid);
    let scan = tokio::task::spawn_blocking(move || {
        IdentityResolver::new(access, config).resolve_query(&query)
    });

    match scan.await {
        Ok(resolution) => {
            if let Reason::EnvironmentUnavailable(e) = &resolution.reason {
                debug!("USB stack unavailable: {}", e);
            }
            resolution.outcome
        }
        Err(e) => {
            error!("USB scan task failed: {}", e);
            Outcome::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_product_id("4776"), Ok(4776));
        assert_eq!(parse_product_id("0"), Ok(0));
        assert_eq!(parse_product_id(" 65535 "), Ok(65535));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_product_id("0x12a8"), Ok(0x12a8));
        assert_eq!(parse_product_id("0X12A8"), Ok(0x12a8));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_product_id("abc").is_err());
        assert!(parse_product_id("65536").is_err());
        assert!(parse_product_id("-1").is_err());
        assert!(parse_product_id("0x").is_err());
    }
}
