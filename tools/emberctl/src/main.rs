//! emberctl: host-side inspection for ember firmware artifacts.
//!
//! Reads Transfer Lists, AML definition blocks and PRM descriptors with the
//! same `no_std` libraries the firmware uses, and patches AML tables in
//! place of a full ASL round trip.

mod aml;
mod cli;
mod config;
mod prm;
mod tl;
mod verbose;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = config::Config::load(cli.config.as_deref())?;
    verbose::init(cli.quiet, cli.verbose, config.log_level()?)?;

    match cli.command {
        cli::Command::Tl(ref command) => tl::run(command, &config),
        cli::Command::Aml(ref command) => aml::run(command, &config),
        cli::Command::Prm(ref command) => prm::run(command),
    }
}
