//! lockdownd session
//!
//! Finds the target device through usbmuxd and opens a lockdownd client on
//! it, optionally upgrading to a TLS session with the host's pairing record.

use idevice::IdeviceError;
use idevice::IdeviceService;
use idevice::lockdown::LockdownClient;
use idevice::provider::IdeviceProvider;
use idevice::usbmuxd::{Connection, UsbmuxdAddr, UsbmuxdDevice};
use plist::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How the device is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookup {
    #[default]
    Usb,
    Network,
}

impl Lookup {
    fn accepts(self, connection: &Connection) -> bool {
        match self {
            Lookup::Usb => matches!(connection, Connection::Usb),
            Lookup::Network => matches!(connection, Connection::Network(_)),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{}", not_found_message(.udid))]
    DeviceNotFound { udid: Option<String> },

    #[error("Could not connect to usbmuxd: {0}")]
    Usbmuxd(#[source] IdeviceError),

    #[error("Could not connect to lockdownd: {0}")]
    Lockdown(#[source] IdeviceError),

    #[error("Request failed: {0}")]
    Request(#[source] IdeviceError),
}

fn not_found_message(udid: &Option<String>) -> String {
    match udid {
        Some(udid) => format!("Device {} not found!", udid),
        None => "No device found!".to_string(),
    }
}

/// Which device to talk to, and how
#[derive(Debug, Clone)]
pub struct SessionTarget<'a> {
    pub udid: Option<&'a str>,
    pub lookup: Lookup,
    /// Label sent with every lockdownd request
    pub label: &'a str,
    /// Start a TLS session with the pairing record after connecting
    pub handshake: bool,
}

/// Pick the device to connect to from the usbmuxd device list
///
/// With a UDID, only that device qualifies; otherwise the first device with
/// the requested attachment does.
pub fn select_device(
    devices: Vec<UsbmuxdDevice>,
    udid: Option<&str>,
    lookup: Lookup,
) -> Option<UsbmuxdDevice> {
    devices
        .into_iter()
        .filter(|d| lookup.accepts(&d.connection_type))
        .find(|d| udid.is_none_or(|u| d.udid == u))
}

/// An open lockdownd client
pub struct LockdownSession {
    client: LockdownClient,
    udid: String,
}

impl LockdownSession {
    /// Look the device up through usbmuxd and connect to lockdownd
    pub async fn connect(target: &SessionTarget<'_>) -> Result<Self, SessionError> {
        let addr = UsbmuxdAddr::from_env_var().unwrap_or_else(|e| {
            warn!("Ignoring bad USBMUXD_SOCKET_ADDRESS: {}", e);
            UsbmuxdAddr::default()
        });

        let mut usbmuxd = addr.connect(0).await.map_err(SessionError::Usbmuxd)?;
        let devices = usbmuxd
            .get_devices()
            .await
            .map_err(SessionError::Usbmuxd)?;
        debug!("usbmuxd reports {} devices", devices.len());

        let device = select_device(devices, target.udid, target.lookup).ok_or_else(|| {
            SessionError::DeviceNotFound {
                udid: target.udid.map(str::to_string),
            }
        })?;
        let udid = device.udid.clone();

        let provider = device.to_provider(addr, target.label);
        let mut client = LockdownClient::connect(&provider)
            .await
            .map_err(SessionError::Lockdown)?;

        if target.handshake {
            let pairing_file = provider
                .get_pairing_file()
                .await
                .map_err(SessionError::Lockdown)?;
            client
                .start_session(&pairing_file)
                .await
                .map_err(SessionError::Lockdown)?;
            debug!("TLS session established with {}", udid);
        }

        info!("Connected to lockdownd on {}", udid);
        Ok(Self { client, udid })
    }

    pub fn udid(&self) -> &str {
        &self.udid
    }

    /// Query a value; both domain and key are optional
    pub async fn get_value(
        &mut self,
        domain: Option<&str>,
        key: Option<&str>,
    ) -> Result<Value, SessionError> {
        self.client
            .get_value(key, domain)
            .await
            .map_err(SessionError::Request)
    }

    pub async fn set_value(
        &mut self,
        domain: &str,
        key: &str,
        value: Value,
    ) -> Result<(), SessionError> {
        self.client
            .set_value(key, value, Some(domain))
            .await
            .map_err(SessionError::Request)
    }
}
