//! HID usage name lookup
//!
//! Names come from a JSON table in the layout of the usb.org "HID Usage
//! Tables" export (`UsagePages[] { Id, Name, UsageIds[] { Id, Name } }`). A
//! subset covering the pages DJ controllers commonly use is embedded; a full
//! export can be loaded from a file instead.

use std::collections::HashMap;
use std::path::Path;

use djhid_transport::DeviceInfo;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;

const EMBEDDED_TABLES: &str = include_str!("../res/hid_usage_tables.json");

/// First vendor-defined usage page
pub const VENDOR_DEFINED_PAGE_START: u16 = 0xFF00;

/// Turns a (usage page, usage) pair into a human readable label
pub trait UsageLookup {
    fn describe(&self, usage_page: u16, usage: u16) -> String;

    /// Label for a 32-bit usage with the page in the upper 16 bits
    fn describe_usage(&self, usage: u32) -> String {
        self.describe((usage >> 16) as u16, (usage & 0xFFFF) as u16)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UsageTableFile {
    usage_pages: Vec<JsonUsagePage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonUsagePage {
    id: u16,
    name: String,
    #[serde(default)]
    usage_ids: Vec<JsonUsageId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonUsageId {
    id: u16,
    name: String,
}

#[derive(Debug, Clone)]
struct UsagePage {
    name: String,
    usages: HashMap<u16, String>,
}

/// Usage names indexed by page and usage id
#[derive(Debug, Clone, Default)]
pub struct UsageTables {
    pages: HashMap<u16, UsagePage>,
}

impl UsageTables {
    /// Tables compiled into the binary
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_json(EMBEDDED_TABLES)
    }

    /// Embedded tables, or empty tables if they cannot be parsed
    pub fn embedded_or_empty() -> Self {
        Self::embedded().unwrap_or_else(|e| {
            warn!("Embedded HID usage tables unusable: {}", e);
            Self::default()
        })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tables = Self::from_json(&content)?;
        debug!(
            "Loaded {} HID usage pages from {}",
            tables.pages.len(),
            path.display()
        );
        Ok(tables)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: UsageTableFile = serde_json::from_str(json)?;
        let pages = file
            .usage_pages
            .into_iter()
            .map(|page| {
                let usages = page
                    .usage_ids
                    .into_iter()
                    .map(|usage| (usage.id, usage.name))
                    .collect();
                (
                    page.id,
                    UsagePage {
                        name: page.name,
                        usages,
                    },
                )
            })
            .collect();
        Ok(Self { pages })
    }

    pub fn page_name(&self, usage_page: u16) -> Option<&str> {
        self.pages.get(&usage_page).map(|p| p.name.as_str())
    }

    pub fn usage_name(&self, usage_page: u16, usage: u16) -> Option<&str> {
        self.pages
            .get(&usage_page)?
            .usages
            .get(&usage)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl UsageLookup for UsageTables {
    fn describe(&self, usage_page: u16, usage: u16) -> String {
        if usage_page >= VENDOR_DEFINED_PAGE_START {
            return format!("Vendor-defined {usage_page:04X}:{usage:04X}");
        }
        match self.pages.get(&usage_page) {
            Some(page) => match page.usages.get(&usage) {
                Some(name) => format!("{} {} {usage_page:04X}:{usage:04X}", page.name, name),
                None => format!("Reserved {usage_page:04X}:{usage:04X}"),
            },
            None => format!("Reserved {usage_page:04X}:{usage:04X}"),
        }
    }
}

/// Category shown next to a device: its top-level usage, prefixed by the interface
pub fn device_category(info: &DeviceInfo, lookup: &dyn UsageLookup) -> String {
    let description = lookup.describe(info.usage_page, info.usage);
    match info.interface_number {
        Some(_) => format!("HID Interface {}: {}", info.format_interface(), description),
        None => description,
    }
}
