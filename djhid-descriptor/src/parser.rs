//! Report descriptor state machine
//!
//! Walks the item stream once, keeping the global item table (with its
//! Push/Pop stack) and the local item table, and lays out controls into
//! reports grouped by top-level Application collection.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::error::DescriptorError;
use crate::item::{Item, ItemReader, ItemTag, COLLECTION_APPLICATION};
use crate::model::{Collection, Control, ControlFlags, Report, ReportType};

/// Largest report accepted, in bits (a report of `u16::MAX` bytes)
pub const MAX_REPORT_BITS: u64 = u16::MAX as u64 * 8;

/// Global item table, copied by value onto the Push stack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GlobalItems {
    usage_page: u16,
    logical_minimum: i32,
    logical_maximum: i32,
    physical_minimum: i32,
    physical_maximum: i32,
    unit_exponent: i32,
    unit: u32,
    report_size: u32,
    report_id: Option<u8>,
    report_count: u32,
}

impl GlobalItems {
    /// Physical range, falling back to the logical range when both bounds are 0
    fn physical_range(&self) -> (i32, i32) {
        if self.physical_minimum == 0 && self.physical_maximum == 0 {
            (self.logical_minimum, self.logical_maximum)
        } else {
            (self.physical_minimum, self.physical_maximum)
        }
    }
}

/// Local item table, cleared after every Main and Collection item
#[derive(Debug, Default)]
struct LocalItems {
    usages: VecDeque<u32>,
    usage_minimum: Option<u32>,
    usage_maximum: Option<u32>,
    designator_index: Option<u32>,
    designator_minimum: Option<u32>,
    designator_maximum: Option<u32>,
    string_index: Option<u32>,
    string_minimum: Option<u32>,
    string_maximum: Option<u32>,
    delimiter: Option<u32>,
}

impl LocalItems {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn usage_range(&self) -> Option<(u32, u32)> {
        Some((self.usage_minimum?, self.usage_maximum?))
    }
}

/// Hands out one usage per control instance of a variable main item
enum UsageSource {
    /// UsageMinimum..=UsageMaximum, pinned at the maximum once exhausted
    Range { next: Option<u32>, min: u32, max: u32 },
    /// Explicit usages in order, the last one repeated once exhausted
    List { usages: VecDeque<u32>, last: u32 },
}

impl UsageSource {
    fn from_locals(locals: &mut LocalItems) -> Self {
        match locals.usage_range() {
            Some((min, max)) => UsageSource::Range {
                next: None,
                min,
                max,
            },
            None => UsageSource::List {
                usages: std::mem::take(&mut locals.usages),
                last: 0,
            },
        }
    }

    fn next_usage(&mut self) -> u32 {
        match self {
            UsageSource::Range { next, min, max } => {
                let usage = match *next {
                    None => *min,
                    Some(prev) if prev < *max => prev + 1,
                    Some(prev) => prev,
                };
                *next = Some(usage);
                usage
            }
            UsageSource::List { usages, last } => {
                if let Some(usage) = usages.pop_front() {
                    *last = usage;
                }
                *last
            }
        }
    }
}

/// Result of a completed parse
#[derive(Debug, Default)]
pub(crate) struct ParseOutput {
    pub collections: Vec<Collection>,
    pub uses_report_ids: Option<bool>,
}

/// Single-pass descriptor parser
#[derive(Debug, Default)]
pub(crate) struct Parser {
    globals: GlobalItems,
    global_stack: Vec<GlobalItems>,
    locals: LocalItems,
    /// Index into `collection.reports` of the report receiving controls
    current_report: Option<usize>,
    collection: Collection,
    collections: Vec<Collection>,
    level: u32,
    uses_report_ids: Option<bool>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(mut self, data: &[u8]) -> Result<ParseOutput, DescriptorError> {
        for item in ItemReader::new(data) {
            let item = item?;
            self.handle_item(&item)?;
        }
        self.finish();
        Ok(ParseOutput {
            collections: self.collections,
            uses_report_ids: self.uses_report_ids,
        })
    }

    fn handle_item(&mut self, item: &Item) -> Result<(), DescriptorError> {
        let Some(tag) = item.tag else {
            trace!(
                "Skipping reserved item 0x{:02X} at offset {}",
                item.prefix,
                item.offset
            );
            return Ok(());
        };
        trace!(
            "{:?} 0x{:X} ({} bytes) at offset {}",
            tag,
            item.payload,
            item.size.len(),
            item.offset
        );

        match tag {
            ItemTag::Input => return self.main_item(ReportType::Input, item),
            ItemTag::Output => return self.main_item(ReportType::Output, item),
            ItemTag::Feature => return self.main_item(ReportType::Feature, item),
            ItemTag::Collection => return self.begin_collection(item),
            ItemTag::EndCollection => self.end_collection(),

            ItemTag::UsagePage => self.globals.usage_page = item.payload as u16,
            ItemTag::LogicalMinimum => self.globals.logical_minimum = item.signed(),
            ItemTag::LogicalMaximum => self.globals.logical_maximum = item.signed(),
            ItemTag::PhysicalMinimum => self.globals.physical_minimum = item.signed(),
            ItemTag::PhysicalMaximum => self.globals.physical_maximum = item.signed(),
            ItemTag::UnitExponent => self.globals.unit_exponent = item.signed(),
            ItemTag::Unit => self.globals.unit = item.payload,
            ItemTag::ReportSize => self.globals.report_size = item.payload,
            ItemTag::ReportId => self.globals.report_id = Some(item.payload as u8),
            ItemTag::ReportCount => self.globals.report_count = item.payload,
            ItemTag::Push => self.global_stack.push(self.globals),
            ItemTag::Pop => {
                self.globals = self
                    .global_stack
                    .pop()
                    .ok_or(DescriptorError::PopWithoutPush {
                        offset: item.offset,
                    })?;
            }

            ItemTag::Usage => {
                let usage = item.usage(self.globals.usage_page);
                self.locals.usages.push_back(usage);
            }
            ItemTag::UsageMinimum => {
                self.locals.usage_minimum = Some(item.usage(self.globals.usage_page));
            }
            ItemTag::UsageMaximum => {
                self.locals.usage_maximum = Some(item.usage(self.globals.usage_page));
            }
            ItemTag::DesignatorIndex => self.locals.designator_index = Some(item.payload),
            ItemTag::DesignatorMinimum => self.locals.designator_minimum = Some(item.payload),
            ItemTag::DesignatorMaximum => self.locals.designator_maximum = Some(item.payload),
            ItemTag::StringIndex => self.locals.string_index = Some(item.payload),
            ItemTag::StringMinimum => self.locals.string_minimum = Some(item.payload),
            ItemTag::StringMaximum => self.locals.string_maximum = Some(item.payload),
            ItemTag::Delimiter => self.locals.delimiter = Some(item.payload),
        }
        Ok(())
    }

    fn main_item(&mut self, report_type: ReportType, item: &Item) -> Result<(), DescriptorError> {
        if self.uses_report_ids.is_none() {
            self.uses_report_ids = Some(self.globals.report_id.is_some());
        }

        let report_id = self.globals.report_id.unwrap_or(0);
        let index = self.open_report(report_type, report_id);
        let report = &mut self.collection.reports[index];

        let flags = ControlFlags(item.payload);
        let globals = self.globals;
        let count = globals.report_count;
        let bits = u64::from(globals.report_size) * u64::from(count);

        let total = report.bit_length() + bits;
        if total > MAX_REPORT_BITS {
            return Err(DescriptorError::ReportTooLarge {
                offset: item.offset,
                bits: total,
            });
        }

        if flags.is_constant() || flags.is_array() {
            trace!(
                "{} report 0x{:02X}: skipping {} bits of {} field",
                report_type,
                report_id,
                bits,
                if flags.is_constant() { "constant" } else { "array" }
            );
            report.advance(bits);
        } else {
            let (physical_minimum, physical_maximum) = globals.physical_range();
            let mut usages = UsageSource::from_locals(&mut self.locals);
            for _ in 0..count {
                let (byte_position, bit_position) = report.last_position();
                report.push_control(Control {
                    flags,
                    usage: usages.next_usage(),
                    logical_minimum: globals.logical_minimum,
                    logical_maximum: globals.logical_maximum,
                    physical_minimum,
                    physical_maximum,
                    unit_exponent: globals.unit_exponent,
                    unit: globals.unit,
                    byte_position,
                    bit_position,
                    bit_size: globals.report_size,
                });
            }
        }

        self.locals.clear();
        Ok(())
    }

    /// Make (type, id) the report receiving controls, creating it on first sight
    ///
    /// A report interrupted by another (type, id) pair and resumed later keeps
    /// its original position and cursor. Starting over at bit 0 instead would
    /// list the pair twice and overlap the first fields.
    fn open_report(&mut self, report_type: ReportType, report_id: u8) -> usize {
        if let Some(index) = self.current_report {
            let current = &self.collection.reports[index];
            if current.report_type == report_type && current.report_id == report_id {
                return index;
            }
            self.seal_report();
        }

        let index = match self
            .collection
            .reports
            .iter()
            .position(|r| r.report_type == report_type && r.report_id == report_id)
        {
            Some(index) => index,
            None => {
                self.collection
                    .reports
                    .push(Report::new(report_type, report_id));
                self.collection.reports.len() - 1
            }
        };
        self.current_report = Some(index);
        index
    }

    fn seal_report(&mut self) {
        if let Some(index) = self.current_report.take() {
            let report = &self.collection.reports[index];
            debug!(
                "Sealed {} report 0x{:02X}: {} controls, {} bits",
                report.report_type,
                report.report_id,
                report.controls.len(),
                report.bit_length()
            );
        }
    }

    fn begin_collection(&mut self, item: &Item) -> Result<(), DescriptorError> {
        self.level = self.level.saturating_add(1);
        if self.level == 1 && item.payload != COLLECTION_APPLICATION {
            return Err(DescriptorError::NonApplicationCollection {
                offset: item.offset,
                kind: item.payload,
            });
        }
        self.locals.clear();
        Ok(())
    }

    fn end_collection(&mut self) {
        if self.level == 1 {
            self.seal_report();
            let collection = std::mem::take(&mut self.collection);
            debug!(
                "Sealed collection {} with {} reports",
                self.collections.len(),
                collection.reports.len()
            );
            self.collections.push(collection);
        }
        self.level = self.level.saturating_sub(1);
        self.locals.clear();
    }

    fn finish(&mut self) {
        if self.collection.reports.is_empty() {
            return;
        }
        warn!(
            "Descriptor ended with {} reports outside a closed Application collection",
            self.collection.reports.len()
        );
        self.seal_report();
        let collection = std::mem::take(&mut self.collection);
        self.collections.push(collection);
    }
}
