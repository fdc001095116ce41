//! Concurrent HID report I/O for DJ controllers
//!
//! This crate owns the device side of a HID controller:
//!
//! - Opening a device with path, serial number and VID/PID fallbacks
//! - A reader thread polling input reports and dropping unchanged repeats
//! - A bounded output report FIFO drained by a writer thread, so producers
//!   never block on device I/O
//! - Blocking feature and input report requests
//! - Device identity formatting and product matching

pub mod backend;
pub mod device_info;
pub mod error;
pub mod fifo;
pub mod reader;
pub mod types;

mod controller;
mod latest;
mod priority;

pub use backend::{open_with_fallback, DeviceHandle, DeviceOpener};
pub use controller::{HidController, SharedDevice};
pub use device_info::{BusType, DeviceInfo, ProductInfo};
pub use error::TransportError;
pub use fifo::{OutputReportFifo, DEFAULT_FIFO_CAPACITY};
pub use latest::LatestOutputReports;
pub use reader::{DedupBuffers, InputPoller};
pub use types::{ControllerState, EngineConfig, InputReport, OpenStrategy};
