//! HID report descriptor parser for DJ controllers
//!
//! Decodes the binary item stream of a HID 1.11 report descriptor into
//! top-level Application collections, each holding the Input, Output and
//! Feature reports of the device with one [`Control`] per variable field.
//!
//! ```
//! use djhid_descriptor::{ReportDescriptor, ReportType};
//!
//! let descriptor = ReportDescriptor::parse(vec![
//!     0x05, 0x01, 0x09, 0x04, 0xA1, 0x01, // Generic Desktop, Joystick, Application
//!     0x09, 0x30, 0x15, 0x00, 0x26, 0xFF, 0x00, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02,
//!     0xC0,
//! ])
//! .unwrap();
//! let report = descriptor.report(ReportType::Input, 0).unwrap();
//! assert_eq!(report.controls[0].usage, 0x0001_0030);
//! ```

pub mod error;
pub mod item;

mod descriptor;
mod model;
mod parser;
mod value;

pub use descriptor::ReportDescriptor;
pub use error::{DescriptorError, ValueError};
pub use model::{Collection, Control, ControlFlags, Report, ReportKey, ReportType};
pub use parser::MAX_REPORT_BITS;
