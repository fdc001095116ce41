//! Descriptor error types

use thiserror::Error;

/// Errors raised while decoding a report descriptor
///
/// Every variant carries the byte offset of the offending item prefix so
/// a malformed descriptor can be located in a hex dump.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Long items are reserved by HID 1.11 and never valid in a class descriptor
    #[error("Long item at offset {offset} is not allowed in a report descriptor")]
    LongItem { offset: usize },

    /// The item announces more payload bytes than the buffer holds
    #[error("Item at offset {offset} needs {needed} payload bytes, only {available} left")]
    TruncatedItem {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Pop item without a matching Push
    #[error("Pop at offset {offset} with an empty global item stack")]
    PopWithoutPush { offset: usize },

    /// The outermost collection must be an Application collection
    #[error("Top-level collection at offset {offset} has type 0x{kind:02X}, expected Application")]
    NonApplicationCollection { offset: usize, kind: u32 },

    /// A main item would grow its report past [`MAX_REPORT_BITS`](crate::MAX_REPORT_BITS)
    #[error("Main item at offset {offset} grows its report to {bits} bits")]
    ReportTooLarge { offset: usize, bits: u64 },
}

/// Errors raised when reading or writing a control value inside a report buffer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The control extends past the end of the buffer
    #[error("Control needs {needed} bytes, buffer has {available}")]
    OutOfBounds { needed: usize, available: usize },

    /// Controls wider than 32 bits are not decoded
    #[error("Unsupported control width of {0} bits")]
    UnsupportedWidth(u32),
}
