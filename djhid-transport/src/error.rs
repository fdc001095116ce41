//! Transport error types

use djhid_descriptor::ReportType;
use thiserror::Error;

/// Errors that can occur while opening or talking to a HID device
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Every open strategy failed
    #[error("Unable to open {0}")]
    OpenFailed(String),

    #[error("Device {0} is already open")]
    AlreadyOpen(String),

    #[error("Device {0} is not open")]
    NotOpen(String),

    #[error("{0} reports cannot be {1}")]
    UnsupportedReportType(ReportType, &'static str),

    // HID-specific errors
    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            TransportError::HidPermissionDenied(msg)
        } else {
            TransportError::HidError(msg)
        }
    }
}
