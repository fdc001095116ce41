//! Tabular layout of parsed reports
//!
//! Every report of a descriptor is shown as one table with a row per
//! control. Input reports end with a read-only value column, Output and
//! Feature reports with an editable one.

use std::fmt;

use djhid_descriptor::{Control, Report, ReportDescriptor, ReportType};

use crate::usage_tables::UsageLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Usage,
    LogicalMinimum,
    LogicalMaximum,
    PhysicalMinimum,
    PhysicalMaximum,
    UnitExponent,
    Unit,
    BytePosition,
    BitPosition,
    BitSize,
    Value { editable: bool },
}

impl Column {
    pub fn header(self) -> &'static str {
        match self {
            Column::Usage => "Usage",
            Column::LogicalMinimum => "Logical Min",
            Column::LogicalMaximum => "Logical Max",
            Column::PhysicalMinimum => "Physical Min",
            Column::PhysicalMaximum => "Physical Max",
            Column::UnitExponent => "Unit Exponent",
            Column::Unit => "Unit",
            Column::BytePosition => "Byte Position",
            Column::BitPosition => "Bit Position",
            Column::BitSize => "Bit Size",
            Column::Value { .. } => "Value",
        }
    }

    pub fn is_editable(self) -> bool {
        matches!(self, Column::Value { editable: true })
    }

    /// Text of this column for one control
    ///
    /// The value column is empty unless a payload (without report id) is given.
    pub fn cell(self, control: &Control, lookup: &dyn UsageLookup, payload: Option<&[u8]>) -> String {
        match self {
            Column::Usage => lookup.describe_usage(control.usage),
            Column::LogicalMinimum => control.logical_minimum.to_string(),
            Column::LogicalMaximum => control.logical_maximum.to_string(),
            Column::PhysicalMinimum => control.physical_minimum.to_string(),
            Column::PhysicalMaximum => control.physical_maximum.to_string(),
            Column::UnitExponent => control.unit_exponent.to_string(),
            Column::Unit => format!("0x{:X}", control.unit),
            Column::BytePosition => control.byte_position.to_string(),
            Column::BitPosition => control.bit_position.to_string(),
            Column::BitSize => control.bit_size.to_string(),
            Column::Value { .. } => match payload {
                Some(payload) => control
                    .extract(payload)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|_| "?".to_string()),
                None => String::new(),
            },
        }
    }
}

const DESCRIPTOR_COLUMNS: [Column; 10] = [
    Column::Usage,
    Column::LogicalMinimum,
    Column::LogicalMaximum,
    Column::PhysicalMinimum,
    Column::PhysicalMaximum,
    Column::UnitExponent,
    Column::Unit,
    Column::BytePosition,
    Column::BitPosition,
    Column::BitSize,
];

const fn with_value(editable: bool) -> [Column; 11] {
    let mut columns = [Column::Value { editable }; 11];
    let mut i = 0;
    while i < DESCRIPTOR_COLUMNS.len() {
        columns[i] = DESCRIPTOR_COLUMNS[i];
        i += 1;
    }
    columns
}

const INPUT_COLUMNS: [Column; 11] = with_value(false);
const EDITABLE_COLUMNS: [Column; 11] = with_value(true);

pub fn columns_for(report_type: ReportType) -> &'static [Column] {
    match report_type {
        ReportType::Input => &INPUT_COLUMNS,
        ReportType::Output | ReportType::Feature => &EDITABLE_COLUMNS,
    }
}

/// `InputReport 0x0A`
pub fn tab_title(report_type: ReportType, report_id: u8) -> String {
    format!("{}Report 0x{:02X}", report_type.name(), report_id)
}

/// `Input Reports`
pub fn group_title(report_type: ReportType) -> String {
    format!("{} Reports", report_type.name())
}

/// What a user can do with a report of a given type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportAction {
    /// Request the current report from the device
    Read,
    /// Write the edited values to the device
    Send,
}

pub fn actions_for(report_type: ReportType) -> &'static [ReportAction] {
    match report_type {
        ReportType::Input => &[ReportAction::Read],
        ReportType::Output => &[ReportAction::Send],
        ReportType::Feature => &[ReportAction::Read, ReportAction::Send],
    }
}

/// Reports of one type across all collections, in descriptor order
pub fn reports_of_type(descriptor: &ReportDescriptor, report_type: ReportType) -> Vec<&Report> {
    descriptor
        .reports()
        .filter(|key| key.report_type == report_type)
        .filter_map(|key| descriptor.report_by_key(key))
        .collect()
}

/// One rendered report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub title: String,
    pub columns: &'static [Column],
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(report: &Report, lookup: &dyn UsageLookup, payload: Option<&[u8]>) -> Self {
        let columns = columns_for(report.report_type);
        let rows = report
            .controls
            .iter()
            .map(|control| {
                columns
                    .iter()
                    .map(|column| column.cell(control, lookup, payload))
                    .collect()
            })
            .collect();
        Self {
            title: tab_title(report.report_type, report.report_id),
            columns,
            rows,
        }
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(column.header().len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

impl fmt::Display for ReportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        writeln!(f, "{}", self.title)?;

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, &width)| format!("{:<width$}", column.header()))
            .collect();
        writeln!(f, "  {}", header.join(" | ").trim_end())?;

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect();
            writeln!(f, "  {}", cells.join(" | ").trim_end())?;
        }
        Ok(())
    }
}
