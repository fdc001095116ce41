//! HID controller I/O engine
//!
//! Owns the device handle once opened. A reader thread polls input reports
//! and broadcasts the ones that changed; a writer thread drains the output
//! FIFO. Feature and input report requests run on the calling thread. All
//! device access goes through one lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use djhid_descriptor::ReportType;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::backend::{open_with_fallback, DeviceHandle, DeviceOpener};
use crate::device_info::DeviceInfo;
use crate::error::TransportError;
use crate::fifo::OutputReportFifo;
use crate::latest::LatestOutputReports;
use crate::reader::{run_reader_loop, InputPoller};
use crate::types::{ControllerState, EngineConfig, InputReport, OpenStrategy};

/// Device handle shared between the engine threads
pub type SharedDevice = Arc<Mutex<Box<dyn DeviceHandle>>>;

/// Broadcast channel capacity for input reports
const INPUT_CHANNEL_CAPACITY: usize = 256;

/// Size of the buffer for report descriptors (HID_API_MAX_REPORT_DESCRIPTOR_SIZE)
const MAX_REPORT_DESCRIPTOR_SIZE: usize = 4096;

/// Threads and handle of one open period
struct IoSession {
    device: SharedDevice,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    strategy: OpenStrategy,
}

impl IoSession {
    /// Stop both threads and wait for them
    ///
    /// The device is switched to non-blocking first so a pending read returns.
    fn shutdown(&mut self, name: &str) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.device.lock().set_blocking_mode(false) {
            warn!("Unable to set {} non-blocking while closing: {}", name, e);
        }
        for (role, handle) in [("reader", self.reader.take()), ("writer", self.writer.take())] {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    warn!("{} {} thread panicked", name, role);
                }
            }
        }
    }
}

/// Writer thread body: drain queued output reports until stopped and empty
fn run_writer_loop(
    name: String,
    device: SharedDevice,
    fifo: Arc<OutputReportFifo>,
    latest: Arc<LatestOutputReports>,
    stop: Arc<AtomicBool>,
    config: EngineConfig,
) {
    debug!("{} writer thread started", name);
    let mut scratch = Vec::new();
    loop {
        let stopping = stop.load(Ordering::Relaxed);
        let mut sent = fifo.send_next(&device, &mut scratch);
        sent |= latest.send_next(&device);
        if !sent {
            if stopping {
                break;
            }
            std::thread::sleep(config.writer_idle_sleep);
        }
    }
    debug!("{} writer thread exiting", name);
}

/// One HID interface of a controller
pub struct HidController {
    info: DeviceInfo,
    name: String,
    config: EngineConfig,
    state: ControllerState,
    session: Option<IoSession>,
    input_tx: broadcast::Sender<InputReport>,
    fifo: Arc<OutputReportFifo>,
    latest: Arc<LatestOutputReports>,
}

impl HidController {
    pub fn new(info: DeviceInfo) -> Self {
        Self::with_config(info, EngineConfig::default())
    }

    pub fn with_config(info: DeviceInfo, config: EngineConfig) -> Self {
        let name = info.format_name();
        let (input_tx, _) = broadcast::channel(INPUT_CHANNEL_CAPACITY);
        Self {
            fifo: Arc::new(OutputReportFifo::new(name.clone(), config.fifo_capacity)),
            latest: Arc::new(LatestOutputReports::new(name.clone())),
            info,
            name,
            config,
            state: ControllerState::Closed,
            session: None,
            input_tx,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Name used in log messages, see [`DeviceInfo::format_name`]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ControllerState::Open
    }

    /// How the current handle was obtained
    pub fn open_strategy(&self) -> Option<OpenStrategy> {
        self.session.as_ref().map(|s| s.strategy)
    }

    /// Receive every input report that differs from its predecessor
    pub fn subscribe(&self) -> broadcast::Receiver<InputReport> {
        self.input_tx.subscribe()
    }

    /// Open the device and start the reader and writer threads
    ///
    /// On failure the controller stays closed and no thread is running.
    pub fn open(&mut self, opener: &dyn DeviceOpener) -> Result<OpenStrategy, TransportError> {
        if self.session.is_some() {
            return Err(TransportError::AlreadyOpen(self.name.clone()));
        }
        info!("Opening HID device {} {}", self.name, self.info);
        self.state = ControllerState::Opening;

        match self.start_session(opener) {
            Ok(session) => {
                let strategy = session.strategy;
                self.session = Some(session);
                self.state = ControllerState::Open;
                info!("Opened {} ({:?})", self.name, strategy);
                Ok(strategy)
            }
            Err(e) => {
                warn!("Failed to open {}: {}", self.name, e);
                self.state = ControllerState::Closed;
                Err(e)
            }
        }
    }

    fn start_session(&self, opener: &dyn DeviceOpener) -> Result<IoSession, TransportError> {
        let (mut handle, strategy) = open_with_fallback(opener, &self.info)?;
        handle.set_blocking_mode(false)?;

        let device: SharedDevice = Arc::new(Mutex::new(handle));
        let stop = Arc::new(AtomicBool::new(false));
        let mut session = IoSession {
            device: device.clone(),
            stop: stop.clone(),
            reader: None,
            writer: None,
            strategy,
        };

        let poller = InputPoller::new(self.name.clone(), &self.config, Instant::now());
        let reader_device = device.clone();
        let reader_tx = self.input_tx.clone();
        let reader_stop = stop.clone();
        let reader_config = self.config.clone();
        session.reader = Some(
            std::thread::Builder::new()
                .name("hid-reader".into())
                .spawn(move || {
                    run_reader_loop(poller, reader_device, reader_tx, reader_stop, reader_config);
                })
                .map_err(|e| {
                    TransportError::Internal(format!("failed to spawn reader thread: {e}"))
                })?,
        );

        let writer_name = self.name.clone();
        let fifo = self.fifo.clone();
        let latest = self.latest.clone();
        let writer_config = self.config.clone();
        let spawned = std::thread::Builder::new()
            .name("hid-writer".into())
            .spawn(move || {
                run_writer_loop(writer_name, device, fifo, latest, stop, writer_config);
            });
        match spawned {
            Ok(handle) => session.writer = Some(handle),
            Err(e) => {
                session.shutdown(&self.name);
                return Err(TransportError::Internal(format!(
                    "failed to spawn writer thread: {e}"
                )));
            }
        }

        Ok(session)
    }

    /// Stop the threads, flush queued output reports and close the handle
    pub fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        info!("Closing {}", self.name);
        self.state = ControllerState::Closing;
        session.shutdown(&self.name);
        // Threads are joined, this drops the last reference to the handle
        drop(session);
        self.state = ControllerState::Closed;
        debug!("{} closed", self.name);
    }

    fn device(&self) -> Result<&SharedDevice, TransportError> {
        self.session
            .as_ref()
            .map(|s| &s.device)
            .ok_or_else(|| TransportError::NotOpen(self.name.clone()))
    }

    /// Raw report descriptor of the open device
    pub fn report_descriptor(&self) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; MAX_REPORT_DESCRIPTOR_SIZE];
        let len = self.device()?.lock().report_descriptor(&mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Blocking request of an input report
    ///
    /// The result starts with the report id byte. An answer carrying no more
    /// than that byte yields an empty vector.
    pub fn get_input_report(&self, report_id: u8) -> Result<Vec<u8>, TransportError> {
        let device = self.device()?;
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        buf[0] = report_id;
        let result = device.lock().get_input_report(&mut buf);
        let len = result.inspect_err(|e| {
            warn!(
                "Unable to get input report 0x{:02X} from {}: {}",
                report_id, self.name, e
            )
        })?;
        if len <= 1 {
            debug!(
                "Input report 0x{:02X} from {} carried no data",
                report_id, self.name
            );
            return Ok(Vec::new());
        }
        buf.truncate(len);
        Ok(buf)
    }

    /// Blocking request of a feature report, returned without the report id byte
    pub fn get_feature_report(&self, report_id: u8) -> Result<Vec<u8>, TransportError> {
        let device = self.device()?;
        let mut buf = vec![0u8; self.config.read_buffer_size + 1];
        buf[0] = report_id;
        let result = device.lock().get_feature_report(&mut buf);
        let len = result.inspect_err(|e| {
            warn!(
                "Unable to get feature report 0x{:02X} from {}: {}",
                report_id, self.name, e
            )
        })?;
        if len <= 1 {
            return Ok(Vec::new());
        }
        Ok(buf[1..len.min(buf.len())].to_vec())
    }

    /// Blocking send of a feature report; failures are not retried
    pub fn send_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        let device = self.device()?;
        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.push(report_id);
        frame.extend_from_slice(data);

        let result = device.lock().send_feature_report(&frame);
        match &result {
            Ok(()) => debug!(
                "{} bytes sent by feature report 0x{:02X} to {}",
                frame.len(),
                report_id,
                self.name
            ),
            Err(e) => warn!(
                "Unable to send feature report 0x{:02X} to {}: {}",
                report_id, self.name, e
            ),
        }
        result
    }

    /// Queue an output report without blocking
    ///
    /// Reports are dropped with a warning when the device is not open or the
    /// FIFO is full. Returns whether the report was queued.
    pub fn send_output_report(&self, report_id: u8, data: &[u8]) -> bool {
        if !self.is_open() {
            warn!(
                "Dropping output report 0x{:02X} for {}: device is {}",
                report_id, self.name, self.state
            );
            return false;
        }
        self.fifo.push(report_id, data)
    }

    /// Queue an output report that replaces any pending one with the same id
    ///
    /// Unless `resend_unchanged` is set, a payload equal to the last one sent
    /// for that id is not written again.
    pub fn send_output_report_latest(
        &self,
        report_id: u8,
        data: &[u8],
        resend_unchanged: bool,
    ) -> bool {
        if !self.is_open() {
            warn!(
                "Dropping output report 0x{:02X} for {}: device is {}",
                report_id, self.name, self.state
            );
            return false;
        }
        self.latest.push(report_id, data, resend_unchanged);
        true
    }

    /// Read a report of any readable type, without the report id byte
    pub fn read_report(
        &self,
        report_type: ReportType,
        report_id: u8,
    ) -> Result<Vec<u8>, TransportError> {
        match report_type {
            ReportType::Input => {
                let mut data = self.get_input_report(report_id)?;
                if !data.is_empty() {
                    data.remove(0);
                }
                Ok(data)
            }
            ReportType::Feature => self.get_feature_report(report_id),
            ReportType::Output => Err(TransportError::UnsupportedReportType(report_type, "read")),
        }
    }

    /// Send a report of any writable type; output reports go through the FIFO
    pub fn send_report(
        &self,
        report_type: ReportType,
        report_id: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        match report_type {
            ReportType::Output => {
                self.device()?;
                self.send_output_report(report_id, data);
                Ok(())
            }
            ReportType::Feature => self.send_feature_report(report_id, data),
            ReportType::Input => Err(TransportError::UnsupportedReportType(report_type, "sent")),
        }
    }
}

impl Drop for HidController {
    fn drop(&mut self) {
        self.close();
    }
}
