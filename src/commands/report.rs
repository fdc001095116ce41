//! Single report command handlers.

use anyhow::{bail, Context};
use djhid::descriptor::ReportType;
use djhid::{ReportTable, UsageTables};
use hidapi::HidApi;
use tracing::debug;

use super::{fetch_descriptor, hex_string, open_controller, CommandResult};

/// Request an input or feature report and print it
///
/// The values are decoded when the device's descriptor describes the report.
pub fn get(
    api: &HidApi,
    device: &str,
    report_type: ReportType,
    report_id: u8,
    tables: &UsageTables,
) -> CommandResult {
    let mut controller = open_controller(api, device)?;
    let payload = controller
        .read_report(report_type, report_id)
        .with_context(|| format!("Reading {report_type} report 0x{report_id:02X}"))?;

    println!(
        "{} report 0x{:02X} ({} bytes): {}",
        report_type,
        report_id,
        payload.len(),
        hex_string(&payload)
    );

    match fetch_descriptor(&controller) {
        Ok(descriptor) => match descriptor.report(report_type, report_id) {
            Some(layout) => print!("{}", ReportTable::new(layout, tables, Some(&payload))),
            None => println!("Report is not described by the device's descriptor"),
        },
        Err(e) => debug!("No descriptor to decode with: {:#}", e),
    }

    controller.close();
    Ok(())
}

/// Send a feature report, or queue an output report and flush it on close
pub fn send(
    api: &HidApi,
    device: &str,
    report_type: ReportType,
    report_id: u8,
    data: &[u8],
) -> CommandResult {
    let mut controller = open_controller(api, device)?;
    match report_type {
        ReportType::Feature => controller
            .send_feature_report(report_id, data)
            .with_context(|| format!("Sending feature report 0x{report_id:02X}"))?,
        ReportType::Output => {
            if !controller.send_output_report(report_id, data) {
                bail!("Output report 0x{report_id:02X} was not queued");
            }
        }
        ReportType::Input => bail!("Input reports cannot be sent"),
    }
    // closing drains the output queue
    controller.close();
    println!(
        "Sent {} report 0x{:02X}: {}",
        report_type,
        report_id,
        hex_string(data)
    );
    Ok(())
}
