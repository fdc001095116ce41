//! Parsed report descriptor and its queries

use serde::Serialize;

use crate::error::DescriptorError;
use crate::model::{Collection, Report, ReportKey, ReportType};
use crate::parser::Parser;

/// A parsed HID report descriptor
///
/// Owns the raw descriptor bytes and the top-level collections decoded from
/// them. Parsing happens once in [`ReportDescriptor::parse`]; all queries
/// afterwards are read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDescriptor {
    #[serde(skip)]
    raw: Vec<u8>,
    uses_report_ids: Option<bool>,
    collections: Vec<Collection>,
}

impl ReportDescriptor {
    /// Decode a raw descriptor
    ///
    /// Fails on long items, truncated payloads, unbalanced Pop items, a
    /// top-level collection that is not an Application collection and reports
    /// longer than [`MAX_REPORT_BITS`](crate::MAX_REPORT_BITS).
    pub fn parse(data: impl Into<Vec<u8>>) -> Result<Self, DescriptorError> {
        let raw = data.into();
        let output = Parser::new().parse(&raw)?;
        Ok(Self {
            raw,
            uses_report_ids: output.uses_report_ids,
            collections: output.collections,
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Whether the device prefixes reports with an id byte
    ///
    /// `None` when the descriptor contains no Input, Output or Feature item.
    pub fn uses_report_ids(&self) -> Option<bool> {
        self.uses_report_ids
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// First report with the given type and id across all collections
    pub fn report(&self, report_type: ReportType, report_id: u8) -> Option<&Report> {
        self.collections
            .iter()
            .find_map(|c| c.report(report_type, report_id))
    }

    pub fn report_by_key(&self, key: ReportKey) -> Option<&Report> {
        self.collections
            .get(key.collection_index)?
            .report(key.report_type, key.report_id)
    }

    /// Every report in encounter order, collection by collection
    ///
    /// Each call walks the parsed model again, so the sequence can be
    /// restarted any number of times.
    pub fn reports(&self) -> impl Iterator<Item = ReportKey> + '_ {
        self.collections
            .iter()
            .enumerate()
            .flat_map(|(collection_index, collection)| {
                collection.reports.iter().map(move |r| ReportKey {
                    collection_index,
                    report_type: r.report_type,
                    report_id: r.report_id,
                })
            })
    }

    pub fn report_list(&self) -> Vec<ReportKey> {
        self.reports().collect()
    }
}
