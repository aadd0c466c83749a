//! `emberctl prm`: PRM export descriptors and PRMT tables.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ember_prm::ExportDescriptor;
use ember_prm::prmt::{self, PRMT_SIGNATURE};

use crate::cli::PrmCommand;
use crate::verbose::vprintln;

/// Runs a `prm` subcommand.
pub fn run(command: &PrmCommand) -> Result<()> {
    match command {
        PrmCommand::Dump { file } => dump(file),
    }
}

fn dump(file: &Path) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    if data.starts_with(&PRMT_SIGNATURE) {
        dump_prmt(file, &data)
    } else {
        dump_descriptor(file, &data)
    }
}

fn dump_descriptor(file: &Path, data: &[u8]) -> Result<()> {
    let desc = ExportDescriptor::parse(data)
        .with_context(|| format!("{}: not a PRM export descriptor", file.display()))?;
    let header = desc.header();
    println!("PRM module export descriptor");
    println!("  revision      {}", { header.revision });
    println!("  platform      {}", desc.platform_guid());
    println!("  module        {}", desc.module_guid());
    println!("  handlers      {}", desc.len());
    for (i, handler) in desc.handlers().enumerate() {
        println!(
            "  [{i}] {} {}",
            handler.guid(),
            handler.name().unwrap_or("<invalid name>")
        );
    }
    vprintln!("{} bytes", desc.size());
    Ok(())
}

fn dump_prmt(file: &Path, data: &[u8]) -> Result<()> {
    let (platform, modules) =
        prmt::parse(data).with_context(|| format!("{}: not a valid PRMT table", file.display()))?;
    println!("PRMT");
    println!("  platform      {platform}");
    println!("  modules       {}", modules.len());
    for module in &modules {
        println!(
            "  module {} v{}.{} mmio={:#x}",
            module.module_guid, module.major_revision, module.minor_revision, module.runtime_mmio_ranges
        );
        for handler in &module.handlers {
            println!(
                "    {} at {:#x} data={:#x} param={:#x}",
                handler.guid,
                handler.physical_address,
                handler.static_data_buffer,
                handler.acpi_parameter_buffer
            );
        }
    }
    Ok(())
}
