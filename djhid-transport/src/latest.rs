//! Latest-state output reports
//!
//! For reports that mirror state (LEDs, displays) only the newest payload per
//! report id matters. Pending payloads are overwritten in place and a payload
//! equal to the one last sent for its id is not written again.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::backend::DeviceHandle;

#[derive(Debug)]
struct PendingReport {
    report_id: u8,
    data: Vec<u8>,
    resend_unchanged: bool,
}

#[derive(Debug, Default)]
struct State {
    /// In order of the first pending update per id
    pending: Vec<PendingReport>,
    /// Last payload written per id, report id prefix excluded
    last_sent: HashMap<u8, Vec<u8>>,
}

/// Per report id slot holding only the most recent output payload
#[derive(Debug)]
pub struct LatestOutputReports {
    name: String,
    state: Mutex<State>,
}

impl LatestOutputReports {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Replace the pending payload for `report_id`
    pub fn push(&self, report_id: u8, data: &[u8], resend_unchanged: bool) {
        let mut state = self.state.lock();
        match state.pending.iter_mut().find(|p| p.report_id == report_id) {
            Some(pending) => {
                trace!(
                    "Coalescing output report 0x{:02X} for {}",
                    report_id,
                    self.name
                );
                pending.data.clear();
                pending.data.extend_from_slice(data);
                pending.resend_unchanged |= resend_unchanged;
            }
            None => state.pending.push(PendingReport {
                report_id,
                data: data.to_vec(),
                resend_unchanged,
            }),
        }
    }

    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Take the next pending report that differs from what the device already has
    fn take_next(&self) -> Option<(u8, Vec<u8>)> {
        let mut state = self.state.lock();
        while !state.pending.is_empty() {
            let report = state.pending.remove(0);
            let unchanged = state.last_sent.get(&report.report_id) == Some(&report.data);
            if unchanged && !report.resend_unchanged {
                trace!(
                    "Skipping unchanged output report 0x{:02X} for {}",
                    report.report_id,
                    self.name
                );
                continue;
            }
            state
                .last_sent
                .insert(report.report_id, report.data.clone());
            return Some((report.report_id, report.data));
        }
        None
    }

    /// Write the next changed report; returns whether a device write was attempted
    pub fn send_next(&self, device: &Mutex<Box<dyn DeviceHandle>>) -> bool {
        let Some((report_id, data)) = self.take_next() else {
            return false;
        };

        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.push(report_id);
        frame.extend_from_slice(&data);

        let result = device.lock().write(&frame);
        match result {
            Ok(written) => debug!(
                "{} bytes sent to {} (latest report id 0x{:02X})",
                written, self.name, report_id
            ),
            Err(e) => {
                warn!(
                    "Unable to send output report 0x{:02X} to {}: {}",
                    report_id, self.name, e
                );
                // Forget it so the same payload is retried on the next update
                self.state.lock().last_sent.remove(&report_id);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesces_per_id_in_first_pending_order() {
        let latest = LatestOutputReports::new("test");
        latest.push(2, &[1], false);
        latest.push(1, &[1], false);
        latest.push(2, &[2], false);
        assert_eq!(latest.pending(), 2);
        assert_eq!(latest.take_next(), Some((2, vec![2])));
        assert_eq!(latest.take_next(), Some((1, vec![1])));
        assert_eq!(latest.take_next(), None);
    }

    #[test]
    fn test_skips_unchanged_payload() {
        let latest = LatestOutputReports::new("test");
        latest.push(1, &[7, 7], false);
        assert!(latest.take_next().is_some());

        latest.push(1, &[7, 7], false);
        assert_eq!(latest.take_next(), None);

        latest.push(1, &[7, 7], true);
        assert_eq!(latest.take_next(), Some((1, vec![7, 7])));
    }
}
