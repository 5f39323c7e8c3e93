//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use overkube::output::OutputConfig;

/// overkube - Compose Kubernetes resource bases and overlays
#[derive(Parser, Debug)]
#[command(name = "overkube")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        env = "OVERKUBE_LOG_LEVEL"
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a kustomization directory and print the resulting resources
    Build(commands::build::BuildArgs),

    /// Check a kustomization and its bases without printing the result
    Validate(commands::validate::ValidateArgs),

    /// Show the base/overlay composition graph
    Tree(commands::tree::TreeArgs),

    /// Create a new kustomization file
    Create(commands::create::CreateArgs),

    /// Edit an existing kustomization file
    Edit(commands::edit::EditArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level)?;
        if !OutputConfig::is_valid_flag(&self.color) {
            return Err(anyhow::anyhow!(
                "invalid --color value '{}' (expected always, never or auto)",
                self.color
            ));
        }

        match self.command {
            Commands::Build(args) => commands::build::execute(args),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
            Commands::Tree(args) => commands::tree::execute(args, &self.color),
            Commands::Create(args) => commands::create::execute(args, &self.color),
            Commands::Edit(args) => commands::edit::execute(args, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Send library logs to stderr so stdout stays a clean YAML stream.
fn init_logging(level: &str) -> Result<()> {
    let filter: log::LevelFilter = level
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid --log-level '{}'", level))?;
    env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
