//! DJ controller HID inspector
//!
//! Lists HID devices, prints their report descriptors and reads and writes
//! reports through the I/O engine.

use anyhow::Context;
use clap::Parser;
use djhid::descriptor::ReportType;
use hidapi::HidApi;
use tracing_subscriber::EnvFilter;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = match cli.verbose {
        0 => "djhid=info",
        1 => "djhid=debug",
        _ => "djhid=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let tables = commands::load_usage_tables(cli.usage_tables.as_deref())?;

    // Parsing a descriptor file needs no HID access
    if let Commands::Descriptor {
        device: None,
        file: Some(ref file),
        json,
    } = cli.command
    {
        return commands::descriptor::descriptor(None, None, Some(file.as_path()), json, &tables);
    }

    let api = HidApi::new().context("Initializing hidapi")?;

    match cli.command {
        Commands::List { products } => {
            commands::list::list(&api, products.as_deref(), &tables)?;
        }
        Commands::Descriptor { device, file, json } => {
            commands::descriptor::descriptor(
                Some(&api),
                device.as_deref(),
                file.as_deref(),
                json,
                &tables,
            )?;
        }
        Commands::Monitor { device, decode } => {
            commands::monitor::monitor(&api, &device, decode, &tables)?;
        }
        Commands::GetInput { device, id } => {
            commands::report::get(&api, &device, ReportType::Input, id, &tables)?;
        }
        Commands::GetFeature { device, id } => {
            commands::report::get(&api, &device, ReportType::Feature, id, &tables)?;
        }
        Commands::SendFeature { device, id, data } => {
            commands::report::send(&api, &device, ReportType::Feature, id, &data.0)?;
        }
        Commands::SendOutput { device, id, data } => {
            commands::report::send(&api, &device, ReportType::Output, id, &data.0)?;
        }
    }

    Ok(())
}
