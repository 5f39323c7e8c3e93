//! # Build Command Implementation
//!
//! Runs the full pipeline on a kustomization directory and writes the
//! result to stdout, a file, or a directory (one file per resource).
//! Status messages go to the log on stderr so stdout stays valid YAML.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use overkube::filesystem::DiskFS;
use overkube::loader::LoadRestrictor;
use overkube::phases::{orchestrator, BuildOptions};

use super::Reorder;

/// Build a kustomization directory
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Directory containing the kustomization file
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Write the output to this path instead of stdout.
    ///
    /// An existing directory receives one file per resource; any other path
    /// receives all documents in one file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Order of the output, overriding the kustomization's sortOptions
    #[arg(long, value_enum, value_name = "ORDER")]
    pub reorder: Option<Reorder>,

    /// Where files named by a kustomization may live (root-only, none)
    #[arg(
        long,
        value_name = "RESTRICTOR",
        default_value = "root-only",
        env = "OVERKUBE_LOAD_RESTRICTOR"
    )]
    pub load_restrictor: LoadRestrictor,
}

/// Execute the `build` command.
pub fn execute(args: BuildArgs) -> Result<()> {
    let options = BuildOptions {
        load_restrictor: args.load_restrictor,
        reorder: args.reorder.map(Into::into),
    };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    orchestrator::execute_build_to(
        &DiskFS,
        &args.dir,
        options,
        args.output.as_deref(),
        &mut handle,
    )
    .map_err(|e| anyhow::anyhow!("Build of {} failed: {}", args.dir.display(), e))?;
    Ok(())
}
