//! Common utilities for ideviceinfo
//!
//! This crate provides shared functionality between the resolver library and
//! the command-line tool: error handling, logging setup, and the USB
//! descriptor types produced by the enumeration layer.

pub mod error;
pub mod logging;
pub mod usb_types;

pub use error::{Error, Result};
pub use logging::setup_logging;
pub use usb_types::{UsbDeviceDescriptor, UsbDeviceRecord, VID_APPLE};
