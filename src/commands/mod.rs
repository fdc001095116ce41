//! Command handlers for the CLI application.
//!
//! - `list`: enumerate HID devices
//! - `descriptor`: fetch or read a report descriptor and print its reports
//! - `monitor`: stream input reports
//! - `report`: request and send single reports

pub mod descriptor;
pub mod list;
pub mod monitor;
pub mod report;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use djhid::descriptor::ReportDescriptor;
use djhid::transport::{DeviceInfo, HidController};
use djhid::UsageTables;
use hidapi::HidApi;
use tracing::{debug, info};

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Usage tables from a file, or the built-in subset
pub fn load_usage_tables(path: Option<&Path>) -> anyhow::Result<UsageTables> {
    match path {
        Some(path) => UsageTables::load_from_file(path)
            .with_context(|| format!("Loading usage tables from {}", path.display())),
        None => Ok(UsageTables::embedded_or_empty()),
    }
}

/// Parse `VID:PID` in hex, e.g. `17cc:1130`
fn parse_vid_pid(target: &str) -> Option<(u16, u16)> {
    let (vid, pid) = target.split_once(':')?;
    let vid = u16::from_str_radix(vid.trim_start_matches("0x"), 16).ok()?;
    let pid = u16::from_str_radix(pid.trim_start_matches("0x"), 16).ok()?;
    Some((vid, pid))
}

/// Find a device by hidraw path or `VID:PID`
///
/// `VID:PID` picks the first enumerated interface of that product.
pub fn resolve_device(api: &HidApi, target: &str) -> anyhow::Result<DeviceInfo> {
    let devices = api.device_list().map(DeviceInfo::from);
    let found = if target.starts_with('/') {
        devices.into_iter().find(|d| d.path == target)
    } else {
        let (vid, pid) = parse_vid_pid(target)
            .ok_or_else(|| anyhow!("'{target}' is neither a device path nor VID:PID"))?;
        devices
            .into_iter()
            .find(|d| d.vendor_id == vid && d.product_id == pid)
    };
    found.ok_or_else(|| anyhow!("No HID device matches '{target}'"))
}

/// Resolve and open a device through the I/O engine
pub fn open_controller(api: &HidApi, target: &str) -> anyhow::Result<HidController> {
    let info = resolve_device(api, target)?;
    debug!("Resolved '{}' to {}", target, info);
    let mut controller = HidController::new(info);
    let strategy = controller
        .open(api)
        .with_context(|| format!("Opening {}", controller.name()))?;
    info!("Opened {} by {:?}", controller.name(), strategy);
    Ok(controller)
}

/// Parsed descriptor of an open device, if it has a usable one
pub fn fetch_descriptor(controller: &HidController) -> anyhow::Result<ReportDescriptor> {
    let raw = controller
        .report_descriptor()
        .context("Reading report descriptor")?;
    if raw.is_empty() {
        bail!("{} returned an empty report descriptor", controller.name());
    }
    ReportDescriptor::parse(raw).context("Parsing report descriptor")
}

/// Space separated hex bytes
pub fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Set up a Ctrl-C handler that sets the given flag to false when triggered.
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vid_pid() {
        assert_eq!(parse_vid_pid("17cc:1130"), Some((0x17cc, 0x1130)));
        assert_eq!(parse_vid_pid("0x17CC:0x1130"), Some((0x17cc, 0x1130)));
        assert_eq!(parse_vid_pid("17cc"), None);
        assert_eq!(parse_vid_pid("xyz:1"), None);
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(hex_string(&[0x01, 0xAB]), "01 ab");
        assert_eq!(hex_string(&[]), "");
    }
}
