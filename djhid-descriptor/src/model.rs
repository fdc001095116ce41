//! Report, control and collection model produced by the parser

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportType {
    Input,
    Output,
    Feature,
}

impl ReportType {
    pub const ALL: [ReportType; 3] = [ReportType::Input, ReportType::Output, ReportType::Feature];

    /// Display name of the report type
    pub fn name(self) -> &'static str {
        match self {
            ReportType::Input => "Input",
            ReportType::Output => "Output",
            ReportType::Feature => "Feature",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Data bits of an Input, Output or Feature main item
///
/// Each bit selects the second alternative of a pair, e.g. bit 0 set means
/// Constant instead of Data. See HID 1.11 section 6.2.2.5.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlFlags(pub u32);

impl ControlFlags {
    pub const CONSTANT: u32 = 0x001;
    pub const VARIABLE: u32 = 0x002;
    pub const RELATIVE: u32 = 0x004;
    pub const WRAP: u32 = 0x008;
    pub const NON_LINEAR: u32 = 0x010;
    pub const NO_PREFERRED: u32 = 0x020;
    pub const NULL_STATE: u32 = 0x040;
    pub const VOLATILE: u32 = 0x080;
    pub const BUFFERED_BYTES: u32 = 0x100;

    const NAMES: [(u32, &'static str, &'static str); 9] = [
        (Self::CONSTANT, "Constant", "Data"),
        (Self::VARIABLE, "Variable", "Array"),
        (Self::RELATIVE, "Relative", "Absolute"),
        (Self::WRAP, "Wrap", "NoWrap"),
        (Self::NON_LINEAR, "NonLinear", "Linear"),
        (Self::NO_PREFERRED, "NoPreferred", "PreferredState"),
        (Self::NULL_STATE, "NullState", "NoNullPosition"),
        (Self::VOLATILE, "Volatile", "NonVolatile"),
        (Self::BUFFERED_BYTES, "BufferedBytes", "BitField"),
    ];

    fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn is_constant(self) -> bool {
        self.has(Self::CONSTANT)
    }

    pub fn is_variable(self) -> bool {
        self.has(Self::VARIABLE)
    }

    pub fn is_array(self) -> bool {
        !self.is_variable()
    }

    pub fn is_relative(self) -> bool {
        self.has(Self::RELATIVE)
    }

    pub fn is_wrap(self) -> bool {
        self.has(Self::WRAP)
    }

    pub fn is_non_linear(self) -> bool {
        self.has(Self::NON_LINEAR)
    }

    pub fn has_no_preferred_state(self) -> bool {
        self.has(Self::NO_PREFERRED)
    }

    pub fn has_null_state(self) -> bool {
        self.has(Self::NULL_STATE)
    }

    pub fn is_volatile(self) -> bool {
        self.has(Self::VOLATILE)
    }

    pub fn is_buffered_bytes(self) -> bool {
        self.has(Self::BUFFERED_BYTES)
    }
}

impl fmt::Debug for ControlFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .map(|&(bit, set, clear)| if self.has(bit) { set } else { clear })
            .collect();
        write!(f, "ControlFlags(0x{:03X}: {})", self.0, names.join("|"))
    }
}

/// One variable field of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub flags: ControlFlags,
    /// Usage page in the upper 16 bits, usage id in the lower 16 bits
    pub usage: u32,
    pub logical_minimum: i32,
    pub logical_maximum: i32,
    pub physical_minimum: i32,
    pub physical_maximum: i32,
    pub unit_exponent: i32,
    pub unit: u32,
    /// Byte offset within the report payload, excluding the report id byte
    pub byte_position: u32,
    /// Bit offset within `byte_position`, always 0..=7
    pub bit_position: u8,
    pub bit_size: u32,
}

impl Control {
    pub fn usage_page(&self) -> u16 {
        (self.usage >> 16) as u16
    }

    pub fn usage_id(&self) -> u16 {
        (self.usage & 0xFFFF) as u16
    }

    /// Absolute bit offset of the first bit of this control
    pub fn bit_offset(&self) -> u64 {
        u64::from(self.byte_position) * 8 + u64::from(self.bit_position)
    }
}

/// All controls sharing one (type, id) pair, in bit layout order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub report_type: ReportType,
    /// Report id, 0 for devices without report ids
    pub report_id: u8,
    pub controls: Vec<Control>,
    last_byte_position: u32,
    last_bit_position: u8,
}

impl Report {
    pub fn new(report_type: ReportType, report_id: u8) -> Self {
        Self {
            report_type,
            report_id,
            controls: Vec::new(),
            last_byte_position: 0,
            last_bit_position: 0,
        }
    }

    /// Cursor where the next control of this report starts
    pub fn last_position(&self) -> (u32, u8) {
        (self.last_byte_position, self.last_bit_position)
    }

    /// Advance the cursor by `bits`, saturating at the largest representable byte offset
    pub(crate) fn advance(&mut self, bits: u64) {
        let total = u64::from(self.last_bit_position).saturating_add(bits);
        let bytes = u64::from(self.last_byte_position).saturating_add(total / 8);
        self.last_byte_position = u32::try_from(bytes).unwrap_or(u32::MAX);
        self.last_bit_position = (total % 8) as u8;
    }

    pub(crate) fn push_control(&mut self, control: Control) {
        self.advance(u64::from(control.bit_size));
        self.controls.push(control);
    }

    /// Total bits described for this report, padding included
    pub fn bit_length(&self) -> u64 {
        u64::from(self.last_byte_position) * 8 + u64::from(self.last_bit_position)
    }

    /// Payload length in bytes, rounded up, without the report id byte
    pub fn byte_length(&self) -> usize {
        self.bit_length().div_ceil(8) as usize
    }

    /// Strip the report id prefix from a raw report when the device uses report ids
    ///
    /// Reports with id 0 are sent without prefix and returned unchanged.
    pub fn payload<'a>(&self, raw: &'a [u8]) -> &'a [u8] {
        if self.report_id != 0 && raw.first() == Some(&self.report_id) {
            &raw[1..]
        } else {
            raw
        }
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// One top-level Application collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub reports: Vec<Report>,
}

impl Collection {
    pub fn report(&self, report_type: ReportType, report_id: u8) -> Option<&Report> {
        self.reports
            .iter()
            .find(|r| r.report_type == report_type && r.report_id == report_id)
    }
}

/// Position of one report within a parsed descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReportKey {
    pub collection_index: usize,
    pub report_type: ReportType,
    pub report_id: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_rule() {
        let mut report = Report::new(ReportType::Input, 0);
        report.advance(3);
        assert_eq!(report.last_position(), (0, 3));
        report.advance(5);
        assert_eq!(report.last_position(), (1, 0));
        report.advance(17);
        assert_eq!(report.last_position(), (3, 1));
        assert_eq!(report.bit_length(), 25);
        assert_eq!(report.byte_length(), 4);
    }

    #[test]
    fn test_cursor_saturates() {
        let mut report = Report::new(ReportType::Feature, 1);
        report.advance(u64::MAX);
        report.advance(u64::MAX);
        assert_eq!(report.last_position().0, u32::MAX);
        assert!(report.last_position().1 < 8);
    }

    #[test]
    fn test_payload_strips_matching_id() {
        let with_id = Report::new(ReportType::Input, 0x05);
        assert_eq!(with_id.payload(&[0x05, 1, 2]), &[1, 2]);
        assert_eq!(with_id.payload(&[0x06, 1, 2]), &[0x06, 1, 2]);

        let without_id = Report::new(ReportType::Input, 0);
        assert_eq!(without_id.payload(&[0, 1, 2]), &[0, 1, 2]);
    }

    #[test]
    fn test_flags_debug_lists_names() {
        let flags = ControlFlags(ControlFlags::VARIABLE | ControlFlags::RELATIVE);
        assert!(flags.is_variable());
        assert!(flags.is_relative());
        assert!(!flags.is_constant());
        let text = format!("{flags:?}");
        assert!(text.starts_with("ControlFlags(0x006: Data|Variable|Relative|"));
    }

    #[test]
    fn test_control_usage_split() {
        let control = Control {
            flags: ControlFlags::default(),
            usage: 0x0009_0003,
            logical_minimum: 0,
            logical_maximum: 1,
            physical_minimum: 0,
            physical_maximum: 1,
            unit_exponent: 0,
            unit: 0,
            byte_position: 2,
            bit_position: 5,
            bit_size: 1,
        };
        assert_eq!(control.usage_page(), 0x0009);
        assert_eq!(control.usage_id(), 0x0003);
        assert_eq!(control.bit_offset(), 21);
    }
}
