//! List command handler.

use std::path::Path;

use anyhow::Context;
use djhid::transport::DeviceInfo;
use djhid::{device_category, ProductList, UsageTables};
use hidapi::HidApi;

use super::CommandResult;

/// List HID devices, optionally only those of known products
pub fn list(api: &HidApi, products: Option<&Path>, tables: &UsageTables) -> CommandResult {
    let products = products
        .map(|path| {
            ProductList::load_from_file(path)
                .with_context(|| format!("Loading products from {}", path.display()))
        })
        .transpose()?;

    let devices: Vec<DeviceInfo> = api
        .device_list()
        .map(DeviceInfo::from)
        .filter(|d| products.as_ref().is_none_or(|p| p.is_supported(d)))
        .collect();

    if devices.is_empty() {
        println!("No HID devices found");
        return Ok(());
    }

    println!("HID devices:");
    for device in &devices {
        println!("  {}", device.format_name());
        println!("    {}", device);
        println!("    {}", device_category(device, tables));
        println!("    path={} bus={:?}", device.path, device.bus_type);
    }
    Ok(())
}
