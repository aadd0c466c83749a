//! `emberctl aml`: AML definition block inspection and patching.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use ember_acpi::InterruptFlags;
use ember_acpi::aml::AmlTree;

use crate::cli::{AddInterruptArgs, AmlCommand};
use crate::config::Config;
use crate::verbose::{Timer, dprintln, vprintln};

/// Runs an `aml` subcommand.
pub fn run(command: &AmlCommand, config: &Config) -> Result<()> {
    match command {
        AmlCommand::Dump { file, verify } => dump(file, *verify || config.aml.compliance),
        AmlCommand::SetInt {
            file,
            path,
            value,
            output,
        } => set_int(file, path, *value, output, config),
        AmlCommand::AddInterrupt(args) => add_interrupt(args, config),
    }
}

fn load(file: &Path) -> Result<AmlTree> {
    let data = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let _t = Timer::start("parse");
    let tree = AmlTree::parse(&data).with_context(|| format!("{}: cannot parse AML", file.display()))?;
    vprintln!("{}: {} nodes", file.display(), tree.len());
    Ok(tree)
}

fn check(tree: &AmlTree) -> Result<()> {
    if let Some(mismatch) = tree.verify_sizes()? {
        bail!("size check failed: {mismatch}");
    }
    Ok(())
}

fn save(mut tree: AmlTree, output: &Path, config: &Config) -> Result<()> {
    if config.aml.compliance {
        check(&tree)?;
    }
    let mut header = tree.header();
    config.aml.apply(&mut header)?;
    tree.set_header(header);

    let table = tree.serialize()?;
    fs::write(output, &table).with_context(|| format!("failed to write {}", output.display()))?;
    dprintln!("wrote {} bytes to {}", table.len(), output.display());
    Ok(())
}

fn dump(file: &Path, verify: bool) -> Result<()> {
    let tree = load(file)?;
    print!("{}", tree.display());
    if verify {
        check(&tree)?;
        dprintln!("sizes ok");
    }
    Ok(())
}

fn set_int(file: &Path, path: &str, value: u64, output: &Path, config: &Config) -> Result<()> {
    let mut tree = load(file)?;
    let name = tree
        .find_node(AmlTree::ROOT, path)
        .with_context(|| format!("cannot find {path}"))?;
    let integer = tree
        .fixed_arg(name, 1)
        .ok_or_else(|| anyhow!("{path} is not a Name"))?;
    let old = tree
        .integer_value(integer)
        .with_context(|| format!("{path} does not hold an integer"))?;
    tree.set_integer_value(integer, value)?;
    vprintln!("{path}: {old:#x} -> {value:#x}");
    save(tree, output, config)
}

fn add_interrupt(args: &AddInterruptArgs, config: &Config) -> Result<()> {
    let mut tree = load(&args.file)?;
    let name = tree
        .find_node(AmlTree::ROOT, &args.path)
        .with_context(|| format!("cannot find {}", args.path))?;

    let mut flags = InterruptFlags::empty();
    flags.set(InterruptFlags::CONSUMER, !args.producer);
    flags.set(InterruptFlags::EDGE, args.edge);
    flags.set(InterruptFlags::ACTIVE_LOW, args.active_low);
    flags.set(InterruptFlags::SHARED, args.shared);
    flags.set(InterruptFlags::WAKE_CAPABLE, args.wake);

    tree.code_gen_rd_interrupt(flags, &args.irqs, Some(name))
        .with_context(|| format!("cannot add an interrupt to {}", args.path))?;
    vprintln!("{}: added {:?} {:?}", args.path, flags, args.irqs);
    save(tree, &args.output, config)
}
