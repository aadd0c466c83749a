//! Command-line interface definitions for emberctl.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Inspect and patch firmware hand-off blobs, AML tables and PRM modules.
#[derive(Parser)]
#[command(name = "emberctl", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: `emberctl.toml` in the working directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only print errors.
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print library diagnostics and timings.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Firmware Handoff Transfer Lists.
    #[command(subcommand)]
    Tl(TlCommand),
    /// AML definition blocks (DSDT/SSDT).
    #[command(subcommand)]
    Aml(AmlCommand),
    /// PRM export descriptors and PRMT tables.
    #[command(subcommand)]
    Prm(PrmCommand),
}

/// `tl` subcommands.
#[derive(Subcommand)]
pub enum TlCommand {
    /// Print the header, its classification and every entry.
    Dump {
        /// Transfer List blob.
        file: PathBuf,
    },
    /// Exit non-zero unless the header is usable.
    Verify {
        /// Transfer List blob.
        file: PathBuf,
    },
    /// Write the payload of the first entry with a tag.
    Extract {
        /// Transfer List blob.
        file: PathBuf,
        /// Tag ID to look for.
        #[arg(long, value_parser = parse_u16)]
        tag: u16,
        /// Output file.
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
    /// Build a new list from payload files.
    Build(TlBuildArgs),
}

/// Arguments for `tl build`.
#[derive(Args)]
pub struct TlBuildArgs {
    /// Entries as `TAG=FILE`, in list order.
    #[arg(long = "entry", value_parser = parse_entry)]
    pub entries: Vec<(u16, PathBuf)>,
    /// Log2 entry alignment (overrides the config file).
    #[arg(long)]
    pub alignment: Option<u8>,
    /// Total list size in bytes (overrides the config file).
    #[arg(long, value_parser = parse_usize)]
    pub size: Option<usize>,
    /// Output file.
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

/// `aml` subcommands.
#[derive(Subcommand)]
pub enum AmlCommand {
    /// Print the object tree.
    Dump {
        /// Definition block.
        file: PathBuf,
        /// Also check every cached size against the tree.
        #[arg(long)]
        verify: bool,
    },
    /// Set the value of a `Name` holding an integer.
    SetInt {
        /// Definition block.
        file: PathBuf,
        /// ASL path of the `Name`, e.g. `\_SB.COM0._UID`.
        path: String,
        /// New value (decimal or `0x` hex).
        #[arg(value_parser = parse_u64)]
        value: u64,
        /// Output file.
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
    /// Append an `Interrupt()` descriptor to a named resource template.
    AddInterrupt(AddInterruptArgs),
}

/// Arguments for `aml add-interrupt`.
#[derive(Args)]
pub struct AddInterruptArgs {
    /// Definition block.
    pub file: PathBuf,
    /// ASL path of the `Name`, e.g. `\_SB.COM0._CRS`.
    pub path: String,
    /// Interrupt numbers.
    #[arg(required = true, value_parser = parse_u32)]
    pub irqs: Vec<u32>,
    /// Edge-triggered instead of level-triggered.
    #[arg(long)]
    pub edge: bool,
    /// Active-low instead of active-high.
    #[arg(long)]
    pub active_low: bool,
    /// Shared with other devices.
    #[arg(long)]
    pub shared: bool,
    /// Wake capable.
    #[arg(long)]
    pub wake: bool,
    /// The device produces the interrupt instead of consuming it.
    #[arg(long)]
    pub producer: bool,
    /// Output file.
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

/// `prm` subcommands.
#[derive(Subcommand)]
pub enum PrmCommand {
    /// Decode an export descriptor or a PRMT table.
    Dump {
        /// Export descriptor blob or PRMT table.
        file: PathBuf,
    },
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number `{s}`: {e}"))
}

fn parse_u32(s: &str) -> Result<u32, String> {
    u32::try_from(parse_u64(s)?).map_err(|_| format!("`{s}` does not fit in 32 bits"))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    u16::try_from(parse_u64(s)?).map_err(|_| format!("`{s}` does not fit in 16 bits"))
}

fn parse_usize(s: &str) -> Result<usize, String> {
    usize::try_from(parse_u64(s)?).map_err(|_| format!("`{s}` is too large"))
}

fn parse_entry(s: &str) -> Result<(u16, PathBuf), String> {
    let (tag, file) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TAG=FILE, got `{s}`"))?;
    Ok((parse_u16(tag)?, PathBuf::from(file)))
}
