// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "djhid")]
#[command(author, version, about = "HID report inspector for DJ controllers")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// HID usage tables JSON replacing the built-in subset
    #[arg(long, global = true, value_name = "FILE")]
    pub usage_tables: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List HID devices
    #[command(visible_aliases = ["ls", "l"])]
    List {
        /// Only show devices matching a product in this JSON file
        #[arg(long, value_name = "FILE")]
        products: Option<PathBuf>,
    },

    /// Parse and print a report descriptor
    #[command(visible_aliases = ["desc", "d"])]
    Descriptor {
        /// hidraw path or VID:PID in hex
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        device: Option<String>,

        /// Read the raw descriptor from a file instead of a device
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Print the parsed descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print input reports until Ctrl-C
    #[command(visible_aliases = ["mon", "m"])]
    Monitor {
        /// hidraw path or VID:PID in hex
        device: String,

        /// Decode reports with the device's report descriptor
        #[arg(long)]
        decode: bool,
    },

    /// Request an input report
    #[command(visible_alias = "gi")]
    GetInput {
        /// hidraw path or VID:PID in hex
        device: String,
        /// Report id (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_report_id)]
        id: u8,
    },

    /// Request a feature report
    #[command(visible_alias = "gf")]
    GetFeature {
        /// hidraw path or VID:PID in hex
        device: String,
        /// Report id (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_report_id)]
        id: u8,
    },

    /// Send a feature report
    #[command(visible_alias = "sf")]
    SendFeature {
        /// hidraw path or VID:PID in hex
        device: String,
        /// Report id (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_report_id)]
        id: u8,
        /// Payload bytes in hex, without the report id (e.g. "01ff" or "01 ff")
        #[arg(value_parser = parse_hex_bytes)]
        data: HexBytes,
    },

    /// Queue an output report
    #[command(visible_alias = "so")]
    SendOutput {
        /// hidraw path or VID:PID in hex
        device: String,
        /// Report id (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_report_id)]
        id: u8,
        /// Payload bytes in hex, without the report id (e.g. "01ff" or "01 ff")
        #[arg(value_parser = parse_hex_bytes)]
        data: HexBytes,
    },
}

/// Payload bytes parsed from a hex string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

pub fn parse_report_id(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid report id '{s}': {e}"))
}

pub fn parse_hex_bytes(s: &str) -> Result<HexBytes, String> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in '{s}'"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex byte in '{s}'"))
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}
