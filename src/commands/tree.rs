//! # Tree Command Implementation
//!
//! Displays the base/overlay composition graph of a kustomization as a
//! tree. Each node shows its directory and what it contributes; resource
//! files appear as leaves.
//!
//! This command is read-only.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use overkube::filesystem::DiskFS;
use overkube::loader::LoadRestrictor;
use overkube::output::{emoji, OutputConfig};
use overkube::phases::{discovery, Entry, KustNode};

/// Display the composition graph
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Directory containing the kustomization file
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Maximum depth to display.
    ///
    /// 0 shows only the root, 1 its direct bases, and so on.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,

    /// Where files named by a kustomization may live (root-only, none)
    #[arg(
        long,
        value_name = "RESTRICTOR",
        default_value = "root-only",
        env = "OVERKUBE_LOAD_RESTRICTOR"
    )]
    pub load_restrictor: LoadRestrictor,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Composition graph for: {}",
        emoji(&out, "🌳", "[TREE]"),
        args.dir.display()
    );

    let root = discovery::execute(&DiskFS, &args.dir, args.load_restrictor)
        .map_err(|e| anyhow::anyhow!("Failed to resolve {}: {}", args.dir.display(), e))?;

    let tree = build_tree_node(&root, &root.dir, args.depth.unwrap_or(usize::MAX), 0);
    print_tree(&tree).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

/// Label for a kustomization node: its directory relative to the root and
/// a summary of what it adds.
fn node_label(node: &KustNode, root_dir: &Path) -> String {
    let dir = display_relative(&node.dir, root_dir);
    let k = &node.kustomization;
    let mut notes = Vec::new();
    if let Some(ns) = k.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        notes.push(format!("namespace={}", ns));
    }
    if let Some(prefix) = k.name_prefix.as_deref().filter(|p| !p.is_empty()) {
        notes.push(format!("prefix={}", prefix));
    }
    if let Some(suffix) = k.name_suffix.as_deref().filter(|s| !s.is_empty()) {
        notes.push(format!("suffix={}", suffix));
    }
    let generators = k.config_map_generator.len() + k.secret_generator.len();
    if generators > 0 {
        notes.push(format!("{} generator(s)", generators));
    }
    let patches = k.patches.len() + k.patches_strategic_merge.len() + k.patches_json6902.len();
    if patches > 0 {
        notes.push(format!("{} patch(es)", patches));
    }
    if notes.is_empty() {
        dir
    } else {
        format!("{} [{}]", dir, notes.join(", "))
    }
}

fn display_relative(path: &Path, root_dir: &Path) -> String {
    match path.strip_prefix(root_dir) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        // Bases outside the root keep their full path.
        Err(_) => path.display().to_string(),
    }
}

fn build_tree_node(node: &KustNode, root_dir: &Path, max_depth: usize, current_depth: usize) -> TreeNode {
    let label = node_label(node, root_dir);
    if current_depth >= max_depth {
        return TreeNode {
            label,
            children: vec![],
        };
    }
    let children = node
        .entries
        .iter()
        .map(|entry| match entry {
            Entry::File(path) => TreeNode {
                label: display_relative(path, root_dir),
                children: vec![],
            },
            Entry::Base(base) => build_tree_node(base, root_dir, max_depth, current_depth + 1),
        })
        .collect();
    TreeNode { label, children }
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
