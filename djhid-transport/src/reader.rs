//! Input report polling with duplicate suppression
//!
//! The reader thread drains the device in bursts of non-blocking reads and
//! sleeps briefly between bursts. Many controllers stream their full state
//! continuously; a report equal to the previous one is dropped before it
//! reaches any consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::backend::DeviceHandle;
use crate::priority;
use crate::types::{EngineConfig, InputReport};

/// Two alternating read buffers
///
/// The next report is read into the spare buffer and compared against the
/// current one; only a differing report flips the buffers, so nothing is
/// copied for the comparison.
#[derive(Debug)]
pub struct DedupBuffers {
    buffers: [Vec<u8>; 2],
    current: usize,
    last_len: usize,
}

impl DedupBuffers {
    pub fn new(size: usize) -> Self {
        Self {
            buffers: [vec![0; size], vec![0; size]],
            current: 0,
            last_len: 0,
        }
    }

    /// Buffer the next read goes into
    pub fn spare(&mut self) -> &mut [u8] {
        &mut self.buffers[1 - self.current]
    }

    /// Accept `len` bytes just read into [`spare`](Self::spare)
    ///
    /// Returns the report unless it repeats the previous one byte for byte.
    /// Reports of different ids share the one previous buffer.
    pub fn accept(&mut self, len: usize) -> Option<&[u8]> {
        let spare = 1 - self.current;
        let len = len.min(self.buffers[spare].len());
        if len == self.last_len
            && self.buffers[spare][..len] == self.buffers[self.current][..self.last_len]
        {
            return None;
        }
        self.current = spare;
        self.last_len = len;
        Some(&self.buffers[spare][..len])
    }
}

/// Reads input reports from a shared device handle
pub struct InputPoller {
    name: String,
    buffers: DedupBuffers,
    started: Instant,
    max_reads_per_burst: usize,
}

impl InputPoller {
    pub fn new(name: impl Into<String>, config: &EngineConfig, started: Instant) -> Self {
        Self {
            name: name.into(),
            buffers: DedupBuffers::new(config.read_buffer_size),
            started,
            max_reads_per_burst: config.max_reads_per_burst,
        }
    }

    /// Read until the device has nothing pending, an error occurs, `stop` is
    /// set or the burst limit is hit
    ///
    /// The device lock is taken per read so on-demand requests can interleave.
    /// Returns the number of reports delivered.
    pub fn poll_burst<F>(
        &mut self,
        device: &Mutex<Box<dyn DeviceHandle>>,
        stop: &AtomicBool,
        mut deliver: F,
    ) -> usize
    where
        F: FnMut(InputReport),
    {
        let mut delivered = 0;
        for _ in 0..self.max_reads_per_burst {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let result = device.lock().read(self.buffers.spare());
            match result {
                Ok(0) => break,
                Ok(len) => {
                    let timestamp = self.started.elapsed();
                    match self.buffers.accept(len) {
                        Some(data) => {
                            trace!(
                                "{} input report at {:?}: {:02X?}",
                                self.name,
                                timestamp,
                                &data[..data.len().min(16)]
                            );
                            deliver(InputReport::new(data.to_vec(), timestamp));
                            delivered += 1;
                        }
                        None => trace!("{} repeated input report dropped", self.name),
                    }
                }
                Err(e) => {
                    warn!("Unable to read input report from {}: {}", self.name, e);
                    break;
                }
            }
        }
        delivered
    }
}

/// Reader thread body: poll bursts until `stop` is set
pub fn run_reader_loop(
    mut poller: InputPoller,
    device: Arc<Mutex<Box<dyn DeviceHandle>>>,
    tx: broadcast::Sender<InputReport>,
    stop: Arc<AtomicBool>,
    config: EngineConfig,
) {
    if config.boost_reader_priority {
        priority::boost_current_thread();
    }
    debug!("{} reader thread started", poller.name);

    while !stop.load(Ordering::Relaxed) {
        poller.poll_burst(&device, &stop, |report| {
            // Send to all subscribers (ignores if no receivers)
            let _ = tx.send(report);
        });
        std::thread::sleep(config.poll_sleep);
    }

    debug!("{} reader thread exiting", poller.name);
}
