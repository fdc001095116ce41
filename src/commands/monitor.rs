//! Monitor command handler.

use std::sync::atomic::Ordering;
use std::time::Duration;

use djhid::descriptor::{ReportDescriptor, ReportType};
use djhid::transport::InputReport;
use djhid::{ReportTable, UsageTables};
use hidapi::HidApi;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::warn;

use super::{fetch_descriptor, hex_string, open_controller, setup_interrupt_handler, CommandResult};

/// Print input reports as they change until Ctrl-C
pub fn monitor(api: &HidApi, device: &str, decode: bool, tables: &UsageTables) -> CommandResult {
    let running = setup_interrupt_handler();
    let mut controller = open_controller(api, device)?;

    let descriptor = if decode {
        match fetch_descriptor(&controller) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!("Printing raw reports only: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let mut rx = controller.subscribe();
    println!("Monitoring {} (Ctrl-C to stop)", controller.name());

    while running.load(Ordering::SeqCst) {
        match rx.try_recv() {
            Ok(report) => print_report(&report, descriptor.as_ref(), tables),
            Err(TryRecvError::Empty) => std::thread::sleep(Duration::from_millis(1)),
            Err(TryRecvError::Lagged(n)) => warn!("Skipped {} input reports", n),
            Err(TryRecvError::Closed) => break,
        }
    }

    controller.close();
    println!("Stopped");
    Ok(())
}

fn print_report(report: &InputReport, descriptor: Option<&ReportDescriptor>, tables: &UsageTables) {
    let millis = report.timestamp.as_secs_f64() * 1000.0;
    println!("[{:>12.3} ms] {}", millis, hex_string(&report.data));

    let Some(descriptor) = descriptor else {
        return;
    };
    let report_id = match descriptor.uses_report_ids() {
        Some(true) => report.data.first().copied().unwrap_or(0),
        _ => 0,
    };
    if let Some(layout) = descriptor.report(ReportType::Input, report_id) {
        let payload = layout.payload(&report.data);
        print!("{}", ReportTable::new(layout, tables, Some(payload)));
    }
}
