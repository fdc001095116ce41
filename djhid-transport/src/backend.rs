//! Device handle abstraction over hidapi
//!
//! The I/O engine only talks to [`DeviceHandle`] and [`DeviceOpener`], so the
//! threading and queueing logic can run against an in-memory device in tests.

use std::ffi::CString;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info, warn};

use crate::device_info::DeviceInfo;
use crate::error::TransportError;
use crate::types::OpenStrategy;

/// An open HID device
///
/// Calls are not reentrant: the engine serializes all access behind one lock.
pub trait DeviceHandle: Send {
    /// Read one input report; returns 0 when non-blocking and nothing is pending
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write one output report, `data[0]` being the report id
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Request an input report, `buf[0]` holding the report id
    fn get_input_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Request a feature report, `buf[0]` holding the report id
    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Send a feature report, `data[0]` being the report id
    fn send_feature_report(&mut self, data: &[u8]) -> Result<(), TransportError>;

    fn set_blocking_mode(&mut self, blocking: bool) -> Result<(), TransportError>;

    /// Copy the raw report descriptor into `buf`
    fn report_descriptor(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

impl DeviceHandle for HidDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(HidDevice::read(self, buf)?)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        Ok(HidDevice::write(self, data)?)
    }

    fn get_input_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(HidDevice::get_input_report(self, buf)?)
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(HidDevice::get_feature_report(self, buf)?)
    }

    fn send_feature_report(&mut self, data: &[u8]) -> Result<(), TransportError> {
        Ok(HidDevice::send_feature_report(self, data)?)
    }

    fn set_blocking_mode(&mut self, blocking: bool) -> Result<(), TransportError> {
        Ok(HidDevice::set_blocking_mode(self, blocking)?)
    }

    fn report_descriptor(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(HidDevice::get_report_descriptor(self, buf)?)
    }
}

/// Opens device handles by the identifiers enumeration provides
pub trait DeviceOpener {
    fn open_path(&self, path: &str) -> Result<Box<dyn DeviceHandle>, TransportError>;

    fn open_serial(
        &self,
        vendor_id: u16,
        product_id: u16,
        serial: &str,
    ) -> Result<Box<dyn DeviceHandle>, TransportError>;

    fn open_vid_pid(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Box<dyn DeviceHandle>, TransportError>;
}

impl DeviceOpener for HidApi {
    fn open_path(&self, path: &str) -> Result<Box<dyn DeviceHandle>, TransportError> {
        let path = CString::new(path)
            .map_err(|e| TransportError::DeviceNotFound(format!("invalid path: {e}")))?;
        Ok(Box::new(HidApi::open_path(self, &path)?))
    }

    fn open_serial(
        &self,
        vendor_id: u16,
        product_id: u16,
        serial: &str,
    ) -> Result<Box<dyn DeviceHandle>, TransportError> {
        Ok(Box::new(HidApi::open_serial(
            self, vendor_id, product_id, serial,
        )?))
    }

    fn open_vid_pid(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Box<dyn DeviceHandle>, TransportError> {
        Ok(Box::new(HidApi::open(self, vendor_id, product_id)?))
    }
}

/// Open a device trying its path, then VID/PID/serial, then VID/PID alone
///
/// The last attempt binds to the first matching unit, which can be the wrong
/// one when several identical controllers are attached.
pub fn open_with_fallback(
    opener: &dyn DeviceOpener,
    info: &DeviceInfo,
) -> Result<(Box<dyn DeviceHandle>, OpenStrategy), TransportError> {
    let name = info.format_name();

    if !info.path.is_empty() {
        match opener.open_path(&info.path) {
            Ok(handle) => return Ok((handle, OpenStrategy::Path)),
            Err(e) => warn!("Unable to open {} by path {}: {}", name, info.path, e),
        }
    }

    if let Some(serial) = info.serial_number.as_deref().filter(|s| !s.is_empty()) {
        match opener.open_serial(info.vendor_id, info.product_id, serial) {
            Ok(handle) => return Ok((handle, OpenStrategy::SerialNumber)),
            Err(e) => warn!(
                "Unable to open {} by {}:{} serial {}: {}",
                name,
                info.format_vid(),
                info.format_pid(),
                serial,
                e
            ),
        }
    } else {
        debug!("{} has no serial number, skipping serial lookup", name);
    }

    match opener.open_vid_pid(info.vendor_id, info.product_id) {
        Ok(handle) => {
            info!(
                "Opened {} by {}:{} only, may be a different unit of the same model",
                name,
                info.format_vid(),
                info.format_pid()
            );
            Ok((handle, OpenStrategy::VendorProduct))
        }
        Err(e) => {
            warn!(
                "Unable to open {} by {}:{}: {}",
                name,
                info.format_vid(),
                info.format_pid(),
                e
            );
            Err(TransportError::OpenFailed(name))
        }
    }
}
