//! Descriptor command handler.

use std::path::Path;

use anyhow::Context;
use djhid::descriptor::{ReportDescriptor, ReportType};
use djhid::{group_title, reports_of_type, ReportTable, UsageTables};
use hidapi::HidApi;

use super::{fetch_descriptor, hex_string, open_controller, CommandResult};

/// Print a descriptor from a device or from a file with the raw bytes
pub fn descriptor(
    api: Option<&HidApi>,
    device: Option<&str>,
    file: Option<&Path>,
    json: bool,
    tables: &UsageTables,
) -> CommandResult {
    let descriptor = match (file, device, api) {
        (Some(path), _, _) => {
            let raw =
                std::fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
            ReportDescriptor::parse(raw).context("Parsing report descriptor")?
        }
        (None, Some(target), Some(api)) => {
            let mut controller = open_controller(api, target)?;
            let descriptor = fetch_descriptor(&controller);
            controller.close();
            descriptor?
        }
        _ => anyhow::bail!("Either a device or --file is required"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
    } else {
        print_descriptor(&descriptor, tables);
    }
    Ok(())
}

pub fn print_descriptor(descriptor: &ReportDescriptor, tables: &UsageTables) {
    println!("Descriptor: {} bytes", descriptor.raw().len());
    println!("  {}", hex_string(descriptor.raw()));
    let ids = match descriptor.uses_report_ids() {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    };
    println!("Report ids: {ids}");
    println!("Collections: {}", descriptor.collections().len());

    for report_type in ReportType::ALL {
        let reports = reports_of_type(descriptor, report_type);
        if reports.is_empty() {
            continue;
        }
        println!();
        println!("=== {} ===", group_title(report_type));
        for report in reports {
            println!();
            print!("{}", ReportTable::new(report, tables, None));
            println!("  ({} bytes)", report.byte_length());
        }
    }
}
