//! In-memory device backend for engine tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use djhid_transport::{DeviceHandle, DeviceInfo, DeviceOpener, InputReport, TransportError};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Scripted answers and recorded calls, shared between test and engine
#[derive(Debug, Default)]
pub struct MockState {
    /// Answers of successive `read` calls; `Ok(0)` once exhausted
    pub reads: VecDeque<Result<Vec<u8>, String>>,
    /// Answers of `get_input_report` per id, report id byte included
    pub input_reports: HashMap<u8, Vec<u8>>,
    /// Answers of `get_feature_report` per id, report id byte included
    pub feature_reports: HashMap<u8, Vec<u8>>,
    pub descriptor: Vec<u8>,
    pub fail_writes: bool,

    pub writes: Vec<Vec<u8>>,
    pub sent_features: Vec<Vec<u8>>,
    pub blocking_modes: Vec<bool>,
}

pub type SharedState = Arc<Mutex<MockState>>;

pub struct MockDevice {
    pub state: SharedState,
}

fn hid_error(msg: &str) -> TransportError {
    TransportError::HidError(msg.to_string())
}

impl DeviceHandle for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.state.lock().reads.pop_front() {
            None => Ok(0),
            Some(Ok(data)) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            Some(Err(msg)) => Err(hid_error(&msg)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(hid_error("write failed"));
        }
        state.writes.push(data.to_vec());
        Ok(data.len())
    }

    fn get_input_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        answer(&self.state.lock().input_reports, buf)
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        answer(&self.state.lock().feature_reports, buf)
    }

    fn send_feature_report(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.state.lock().sent_features.push(data.to_vec());
        Ok(())
    }

    fn set_blocking_mode(&mut self, blocking: bool) -> Result<(), TransportError> {
        self.state.lock().blocking_modes.push(blocking);
        Ok(())
    }

    fn report_descriptor(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let state = self.state.lock();
        let len = state.descriptor.len().min(buf.len());
        buf[..len].copy_from_slice(&state.descriptor[..len]);
        Ok(len)
    }
}

fn answer(reports: &HashMap<u8, Vec<u8>>, buf: &mut [u8]) -> Result<usize, TransportError> {
    let report = reports
        .get(&buf[0])
        .ok_or_else(|| hid_error("unknown report id"))?;
    let len = report.len().min(buf.len());
    buf[..len].copy_from_slice(&report[..len]);
    Ok(len)
}

/// Opener whose individual strategies can be made to fail
pub struct MockOpener {
    pub state: SharedState,
    pub path_ok: bool,
    pub serial_ok: bool,
    pub vid_pid_ok: bool,
    pub attempts: Mutex<Vec<&'static str>>,
}

impl MockOpener {
    pub fn new(state: SharedState) -> Self {
        Self {
            state,
            path_ok: true,
            serial_ok: true,
            vid_pid_ok: true,
            attempts: Mutex::new(Vec::new()),
        }
    }

    fn attempt(&self, strategy: &'static str, ok: bool) -> Result<Box<dyn DeviceHandle>, TransportError> {
        self.attempts.lock().push(strategy);
        if ok {
            Ok(Box::new(MockDevice {
                state: self.state.clone(),
            }))
        } else {
            Err(TransportError::DeviceNotFound(strategy.to_string()))
        }
    }
}

impl DeviceOpener for MockOpener {
    fn open_path(&self, _path: &str) -> Result<Box<dyn DeviceHandle>, TransportError> {
        self.attempt("path", self.path_ok)
    }

    fn open_serial(
        &self,
        _vendor_id: u16,
        _product_id: u16,
        _serial: &str,
    ) -> Result<Box<dyn DeviceHandle>, TransportError> {
        self.attempt("serial", self.serial_ok)
    }

    fn open_vid_pid(
        &self,
        _vendor_id: u16,
        _product_id: u16,
    ) -> Result<Box<dyn DeviceHandle>, TransportError> {
        self.attempt("vid_pid", self.vid_pid_ok)
    }
}

pub fn test_device_info() -> DeviceInfo {
    DeviceInfo {
        vendor_id: 0x17cc,
        product_id: 0x1130,
        usage_page: 0xff01,
        usage: 0x0001,
        interface_number: Some(4),
        path: "/dev/hidraw7".into(),
        serial_number: Some("00C0FFEE".into()),
        product: Some("Kontrol Mock".into()),
        ..Default::default()
    }
}

/// Wait for `count` input reports, giving up after `timeout`
pub fn collect_reports(
    rx: &mut broadcast::Receiver<InputReport>,
    count: usize,
    timeout: Duration,
) -> Vec<InputReport> {
    let deadline = Instant::now() + timeout;
    let mut reports = Vec::new();
    while reports.len() < count && Instant::now() < deadline {
        match rx.try_recv() {
            Ok(report) => reports.push(report),
            Err(broadcast::error::TryRecvError::Empty) => {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(broadcast::error::TryRecvError::Closed) => break,
        }
    }
    reports
}
