//! Tool configuration management

use anyhow::{Context, Result, anyhow};
use resolver::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub general: GeneralSettings,
    #[serde(default)]
    pub usb: UsbSettings,
    /// Additional lockdownd domains treated as known
    #[serde(default)]
    pub domains: DomainSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    pub log_level: String,
    /// Label sent to lockdownd with every request
    #[serde(default = "GeneralSettings::default_label")]
    pub label: String,
}

impl GeneralSettings {
    fn default_label() -> String {
        "ideviceinfo".to_string()
    }
}

/// Settings for the descriptor probe (`--find`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Vendor id of candidate devices, as "0x05ac"
    #[serde(default = "UsbSettings::default_vendor_id")]
    pub vendor_id: String,
    /// Timeout for each string-descriptor read
    #[serde(default = "UsbSettings::default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Maximum bytes read from a serial-number descriptor
    #[serde(default = "UsbSettings::default_max_serial_len")]
    pub max_serial_len: usize,
}

impl UsbSettings {
    const MAX_READ_TIMEOUT_MS: u64 = 10_000;
    const MAX_SERIAL_LEN: usize = 255;

    fn default_vendor_id() -> String {
        format!("0x{:04x}", common::VID_APPLE)
    }

    fn default_read_timeout_ms() -> u64 {
        1000
    }

    fn default_max_serial_len() -> usize {
        resolver::MAX_SERIAL_LEN
    }

    /// Vendor id as a number; `validate` guarantees it parses
    pub fn vendor_id(&self) -> Result<u16> {
        parse_hex_id(&self.vendor_id, "vendor_id")
    }
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            vendor_id: Self::default_vendor_id(),
            read_timeout_ms: Self::default_read_timeout_ms(),
            max_serial_len: Self::default_max_serial_len(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainSettings {
    #[serde(default)]
    pub extra: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            general: GeneralSettings {
                log_level: "warn".to_string(),
                label: GeneralSettings::default_label(),
            },
            usb: UsbSettings::default(),
            domains: DomainSettings::default(),
        }
    }
}

impl ToolConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/ideviceinfo/config.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::debug!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ToolConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("ideviceinfo").join("config.toml")
        } else {
            PathBuf::from(".config/ideviceinfo/config.toml")
        }
    }

    /// Resolver settings derived from the `[usb]` section
    pub fn resolver_config(&self) -> Result<ResolverConfig> {
        Ok(ResolverConfig {
            vendor_id: self.usb.vendor_id()?,
            max_serial_len: self.usb.max_serial_len,
            read_timeout: Duration::from_millis(self.usb.read_timeout_ms),
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.general.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.general.label.is_empty() {
            return Err(anyhow!("Empty lockdownd label"));
        }

        parse_hex_id(&self.usb.vendor_id, "vendor_id")?;

        let timeout = self.usb.read_timeout_ms;
        if timeout == 0 || timeout > UsbSettings::MAX_READ_TIMEOUT_MS {
            return Err(anyhow!(
                "Invalid read_timeout_ms {}, must be 1-{}",
                timeout,
                UsbSettings::MAX_READ_TIMEOUT_MS
            ));
        }

        if self.usb.max_serial_len == 0 || self.usb.max_serial_len > UsbSettings::MAX_SERIAL_LEN {
            return Err(anyhow!(
                "Invalid max_serial_len {}, must be 1-{}",
                self.usb.max_serial_len,
                UsbSettings::MAX_SERIAL_LEN
            ));
        }

        if self.domains.extra.iter().any(|d| d.is_empty()) {
            return Err(anyhow!("Empty domain name in domains.extra"));
        }

        Ok(())
    }
}

/// Parse a hex USB id such as "0x05ac"
fn parse_hex_id(id: &str, name: &str) -> Result<u16> {
    if !id.starts_with("0x") && !id.starts_with("0X") {
        return Err(anyhow!(
            "Invalid {} '{}', must start with '0x' (e.g., '0x05ac')",
            name,
            id
        ));
    }

    let hex_part = &id[2..];
    if hex_part.is_empty() || hex_part.len() > 4 {
        return Err(anyhow!(
            "Invalid {} '{}', hex part must be 1-4 digits",
            name,
            id
        ));
    }

    u16::from_str_radix(hex_part, 16)
        .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))
}

/// Load from a user-supplied path, expanding a leading `~`
pub fn load_config(path: &str) -> Result<ToolConfig> {
    let path_buf = PathBuf::from(shellexpand::tilde(path).as_ref());
    ToolConfig::load(Some(path_buf))
}
