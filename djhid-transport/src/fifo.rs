//! Bounded output report queue
//!
//! Producers on any thread append reports without ever blocking on the
//! device; a single writer drains the ring in order. The ring lock is never
//! held while the device is written.

use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::backend::DeviceHandle;

/// Number of slots; the ring holds one report less
pub const DEFAULT_FIFO_CAPACITY: usize = 32;

#[derive(Debug)]
struct Ring {
    /// Report id followed by payload; storage is reused across laps
    slots: Vec<Vec<u8>>,
    /// Slot of the most recently queued report
    last_cached: usize,
    /// Slot of the most recently sent report
    last_sent: usize,
}

impl Ring {
    fn next(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }

    fn len(&self) -> usize {
        (self.last_cached + self.slots.len() - self.last_sent) % self.slots.len()
    }
}

/// Ring buffer of pending output reports
#[derive(Debug)]
pub struct OutputReportFifo {
    name: String,
    ring: Mutex<Ring>,
}

impl OutputReportFifo {
    /// Create a FIFO with `capacity` slots (at least two)
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            name: name.into(),
            ring: Mutex::new(Ring {
                slots: vec![Vec::new(); capacity],
                last_cached: 0,
                last_sent: 0,
            }),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.ring.lock().slots.len()
    }

    /// Reports queued and not yet sent
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue a report; drops it with a warning when the ring is full
    ///
    /// Returns whether the report was queued.
    pub fn push(&self, report_id: u8, data: &[u8]) -> bool {
        let mut ring = self.ring.lock();
        let next = ring.next(ring.last_cached);
        if next == ring.last_sent {
            warn!(
                "Output report FIFO of {} is full, dropping report 0x{:02X} ({} bytes)",
                self.name,
                report_id,
                data.len()
            );
            return false;
        }

        let slot = &mut ring.slots[next];
        slot.clear();
        slot.push(report_id);
        slot.extend_from_slice(data);
        ring.last_cached = next;
        true
    }

    /// Take the oldest pending report, swapping `buf` into its slot
    ///
    /// Returns false when nothing is pending; `buf` is left untouched then.
    pub fn pop_into(&self, buf: &mut Vec<u8>) -> bool {
        let mut ring = self.ring.lock();
        if ring.last_sent == ring.last_cached {
            return false;
        }
        let index = ring.next(ring.last_sent);
        ring.last_sent = index;
        std::mem::swap(&mut ring.slots[index], buf);
        true
    }

    /// Write the oldest pending report to the device
    ///
    /// `scratch` is exchanged with the ring slot so no allocation happens on
    /// the steady path. Returns whether a device write was attempted, which
    /// lets the writer decide whether to sleep.
    pub fn send_next(&self, device: &Mutex<Box<dyn DeviceHandle>>, scratch: &mut Vec<u8>) -> bool {
        if !self.pop_into(scratch) {
            return false;
        }

        let started = Instant::now();
        let result = device.lock().write(scratch.as_slice());
        match result {
            Ok(written) => debug!(
                "{} bytes sent to {} (report id 0x{:02X}) in {:?}",
                written,
                self.name,
                scratch.first().copied().unwrap_or(0),
                started.elapsed()
            ),
            Err(e) => warn!("Unable to send output report to {}: {}", self.name, e),
        }
        true
    }
}
