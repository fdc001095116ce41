//! DJ controller HID inspection
//!
//! Glue between the descriptor parser, the I/O engine and the command line:
//! usage names, product matching and the tabular report layout.

pub mod error;
pub mod products;
pub mod report_table;
pub mod usage_tables;

pub use djhid_descriptor as descriptor;
pub use djhid_transport as transport;

pub use error::ConfigError;
pub use products::ProductList;
pub use report_table::{
    actions_for, columns_for, group_title, reports_of_type, tab_title, Column, ReportAction,
    ReportTable,
};
pub use usage_tables::{device_category, UsageLookup, UsageTables};
