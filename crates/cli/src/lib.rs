//! ideviceinfo
//!
//! Shows information about a connected device by querying lockdownd, toggles
//! AssistiveTouch, and probes USB descriptors for a device serial.

pub mod assistive;
pub mod config;
pub mod domains;
pub mod find;
pub mod output;
pub mod session;

pub use config::ToolConfig;
pub use output::OutputFormat;
