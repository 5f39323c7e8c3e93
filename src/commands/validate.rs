//! # Validate Command Implementation
//!
//! Checks a kustomization directory without printing the built resources.
//!
//! ## Functionality
//!
//! - **Descriptor Validation**: Parses the kustomization file and checks its
//!   structure.
//! - **Graph Validation**: Resolves every base, detecting cycles, missing
//!   kustomizations, remote references and load restriction violations.
//! - **Warnings**: Reports deprecated and unsupported fields in every
//!   kustomization of the graph. `--strict` turns warnings into a failure.
//! - **Build Check**: Runs the full pipeline so patch targets, generators and
//!   id conflicts are checked too.
//!
//! This command is read-only.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use overkube::filesystem::DiskFS;
use overkube::kustomization;
use overkube::loader::LoadRestrictor;
use overkube::output::{marker, OutputConfig, Status};
use overkube::phases::{discovery, orchestrator, BuildOptions, KustNode};

/// Validate a kustomization directory
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Directory containing the kustomization file
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Use strict validation (fail on warnings)
    #[arg(long)]
    pub strict: bool,

    /// Where files named by a kustomization may live (root-only, none)
    #[arg(
        long,
        value_name = "RESTRICTOR",
        default_value = "root-only",
        env = "OVERKUBE_LOAD_RESTRICTOR"
    )]
    pub load_restrictor: LoadRestrictor,
}

/// Execute the `validate` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let dir = &args.dir;
    println!(
        "{} Validating kustomization in: {}",
        marker(&out, Status::Scan),
        dir.display()
    );

    let (path, root_kustomization) = match kustomization::load(&DiskFS, dir)
        .and_then(|(path, k)| k.validate(&path).map(|_| (path, k)))
    {
        Ok(loaded) => {
            println!(
                "{} {} parsed successfully",
                marker(&out, Status::Ok),
                loaded.0.display()
            );
            loaded
        }
        Err(e) => {
            println!("{} {}", marker(&out, Status::Error), e);
            return Err(anyhow::anyhow!("Kustomization validation failed: {}", e));
        }
    };

    println!("\n{} Kustomization Summary:", marker(&out, Status::Info));
    println!(
        "   Resources: {}",
        root_kustomization.resource_entries().count()
    );
    println!(
        "   Generators: {}",
        root_kustomization.config_map_generator.len() + root_kustomization.secret_generator.len()
    );
    println!(
        "   Patches: {}",
        root_kustomization.patches.len()
            + root_kustomization.patches_strategic_merge.len()
            + root_kustomization.patches_json6902.len()
    );

    println!(
        "\n{} Resolving bases and overlays...",
        marker(&out, Status::Scan)
    );
    let root = match discovery::execute(&DiskFS, dir, args.load_restrictor) {
        Ok(root) => {
            println!(
                "{} Composition graph resolved: {} kustomizations, depth {}",
                marker(&out, Status::Ok),
                root.node_count(),
                root.depth()
            );
            root
        }
        Err(e) => {
            println!("{} {}", marker(&out, Status::Error), e);
            return Err(anyhow::anyhow!("Validation of {} failed: {}", path.display(), e));
        }
    };

    let warnings = collect_warnings(&root);
    for warning in &warnings {
        println!("{} {}", marker(&out, Status::Warn), warning);
    }

    println!("\n{} Building...", marker(&out, Status::Scan));
    let options = BuildOptions {
        load_restrictor: args.load_restrictor,
        reorder: None,
    };
    match orchestrator::execute_build(&DiskFS, dir, options) {
        Ok(resources) => println!(
            "{} Build succeeded: {} resources",
            marker(&out, Status::Ok),
            resources.len()
        ),
        Err(e) => {
            println!("{} {}", marker(&out, Status::Error), e);
            return Err(anyhow::anyhow!("Validation of {} failed: {}", path.display(), e));
        }
    }

    if !warnings.is_empty() && args.strict {
        println!(
            "\n{} Validation failed: {} warning(s) in strict mode",
            marker(&out, Status::Error),
            warnings.len()
        );
        return Err(anyhow::anyhow!(
            "Validation failed with {} warning(s) (strict mode)",
            warnings.len()
        ));
    }

    if warnings.is_empty() {
        println!("\n{} Validation passed", marker(&out, Status::Ok));
    } else {
        println!(
            "\n{} Validation passed with {} warning(s)",
            marker(&out, Status::Warn),
            warnings.len()
        );
    }
    Ok(())
}

/// Warnings of every kustomization in the graph, each prefixed with its
/// file. A base reached twice is reported once.
fn collect_warnings(root: &KustNode) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !seen.insert(node.kustomization_path.clone()) {
            continue;
        }
        for warning in node.kustomization.warnings() {
            warnings.push(format!("{}: {}", node.kustomization_path.display(), warning));
        }
        stack.extend(node.bases());
    }
    warnings
}
