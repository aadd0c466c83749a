//! `emberctl tl`: Transfer List inspection and assembly.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail, ensure};
use ember_transfer_list::{TransferList, TransferListBuilder, TransferListOps, tag};

use crate::cli::{TlBuildArgs, TlCommand};
use crate::config::Config;
use crate::verbose::{dprintln, vprintln};

/// Runs a `tl` subcommand.
pub fn run(command: &TlCommand, config: &Config) -> Result<()> {
    match command {
        TlCommand::Dump { file } => dump(file),
        TlCommand::Verify { file } => verify(file),
        TlCommand::Extract { file, tag, output } => extract(file, *tag, output),
        TlCommand::Build(args) => build(args, config),
    }
}

fn read(file: &Path) -> Result<Vec<u8>> {
    fs::read(file).with_context(|| format!("failed to read {}", file.display()))
}

fn open<'a>(file: &Path, data: &'a [u8]) -> Result<(TransferList<'a>, TransferListOps)> {
    let list = TransferList::new(data).with_context(|| format!("{}", file.display()))?;
    let ops = list.check_header();
    Ok((list, ops))
}

fn dump(file: &Path) -> Result<()> {
    let data = read(file)?;
    let (list, ops) = open(file, &data)?;
    dprintln!("{}: {ops:?}", file.display());
    list.dump();
    Ok(())
}

fn verify(file: &Path) -> Result<()> {
    let data = read(file)?;
    let (list, ops) = open(file, &data)?;
    if ops == TransferListOps::Invalid {
        bail!("{}: invalid transfer list", file.display());
    }
    let entries = list.entries().count();
    dprintln!("{}: ok ({ops:?}, {entries} entries)", file.display());
    Ok(())
}

fn extract(file: &Path, tag_id: u16, output: &Path) -> Result<()> {
    let data = read(file)?;
    let (list, ops) = open(file, &data)?;
    ensure!(
        ops != TransferListOps::Invalid,
        "{}: invalid transfer list",
        file.display()
    );
    let entry = list.find_first_entry(tag_id).ok_or_else(|| {
        anyhow!(
            "{}: no entry with tag {tag_id:#x} ({})",
            file.display(),
            tag::name(tag_id).unwrap_or("unknown")
        )
    })?;
    let payload = entry.data().unwrap_or_default();
    fs::write(output, payload)
        .with_context(|| format!("failed to write {}", output.display()))?;
    dprintln!(
        "wrote {} bytes from offset {:#x} to {}",
        payload.len(),
        entry.offset(),
        output.display()
    );
    Ok(())
}

fn build(args: &TlBuildArgs, config: &Config) -> Result<()> {
    let alignment = args.alignment.unwrap_or(config.transfer_list.alignment);
    let size = args.size.unwrap_or(config.transfer_list.max_size);
    let mut buf = vec![0u8; size];
    let mut builder = TransferListBuilder::init(&mut buf, alignment)
        .map_err(|e| anyhow!("cannot create a {size:#x}-byte list: {e}"))?;
    for (tag_id, file) in &args.entries {
        let payload = read(file)?;
        let offset = builder
            .add_entry(*tag_id, &payload)
            .map_err(|e| anyhow!("adding {}: {e}", file.display()))?;
        vprintln!("tag {tag_id:#x}: {} bytes at {offset:#x}", payload.len());
    }
    let used = builder.finish().len();
    fs::write(&args.output, &buf)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    dprintln!(
        "wrote {} entries, {used:#x} of {size:#x} bytes used, to {}",
        args.entries.len(),
        args.output.display()
    );
    Ok(())
}
