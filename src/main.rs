//! # overkube CLI
//!
//! Binary entry point for the `overkube` command-line tool.
//!
//! It parses arguments with `clap` and dispatches to one command module.
//! All build logic lives in the `overkube` library crate; the binary is a
//! thin wrapper that adds argument handling, logging setup and
//! human-readable status output.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
