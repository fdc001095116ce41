//! Common types for the I/O engine

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// One accepted input report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputReport {
    /// Raw report bytes as read, including the report id when the device uses ids
    pub data: Vec<u8>,
    /// Time since the device was opened
    pub timestamp: Duration,
}

impl InputReport {
    pub fn new(data: Vec<u8>, timestamp: Duration) -> Self {
        Self { data, timestamp }
    }
}

/// Lifecycle of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    Closed,
    Opening,
    /// Reader and writer threads are running
    Open,
    Closing,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Closed => "closed",
            ControllerState::Opening => "opening",
            ControllerState::Open => "open",
            ControllerState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Which open attempt produced the device handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenStrategy {
    /// Stable platform path (hidraw node, IOService path, ...)
    Path,
    /// Vendor id, product id and serial number
    SerialNumber,
    /// Vendor id and product id only; may pick the wrong one of several identical units
    VendorProduct,
}

/// Tunables of the reader and writer threads
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sleep between two poll bursts
    #[serde(with = "micros")]
    pub poll_sleep: Duration,
    /// Upper bound of non-blocking reads in one burst
    pub max_reads_per_burst: usize,
    /// Size of each input buffer
    pub read_buffer_size: usize,
    /// Number of FIFO slots; holds one report less than this
    pub fifo_capacity: usize,
    /// Sleep of the writer thread when nothing was sent
    #[serde(with = "micros")]
    pub writer_idle_sleep: Duration,
    /// Raise the scheduling priority of the reader thread
    pub boost_reader_priority: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_sleep: Duration::from_micros(500),
            max_reads_per_burst: 512,
            read_buffer_size: 255,
            fifo_capacity: crate::fifo::DEFAULT_FIFO_CAPACITY,
            writer_idle_sleep: Duration::from_millis(1),
            boost_reader_priority: true,
        }
    }
}

/// Durations given as whole microseconds
mod micros {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_sleep, Duration::from_micros(500));
        assert_eq!(config.max_reads_per_burst, 512);
        assert_eq!(config.read_buffer_size, 255);
        assert_eq!(config.fifo_capacity, 32);
    }

    #[test]
    fn test_engine_config_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "poll_sleep": 250, "fifo_capacity": 8 }"#).unwrap();
        assert_eq!(config.poll_sleep, Duration::from_micros(250));
        assert_eq!(config.fifo_capacity, 8);
        assert_eq!(config.max_reads_per_burst, 512);
    }
}
