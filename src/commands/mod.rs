//! # CLI Command Implementations
//!
//! One module per `overkube` subcommand. Each module contains:
//! - An `Args` struct defining the command's arguments, derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `overkube` library.

pub mod build;
pub mod completions;
pub mod create;
pub mod edit;
pub mod tree;
pub mod validate;

use clap::ValueEnum;
use overkube::kustomization::SortOrder;

/// Output order accepted by `--reorder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Reorder {
    /// Kind-based order: namespaces and config first, webhooks last
    Legacy,
    /// Keep the order in which resources were accumulated
    None,
}

impl From<Reorder> for SortOrder {
    fn from(reorder: Reorder) -> Self {
        match reorder {
            Reorder::Legacy => SortOrder::Legacy,
            Reorder::None => SortOrder::Fifo,
        }
    }
}

/// Parse `k:v,k2:v2` into pairs. Values may be empty; keys may not.
pub fn parse_pairs(raw: &str) -> anyhow::Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once(':').unwrap_or((pair, ""));
            let key = key.trim();
            if key.is_empty() {
                return Err(anyhow::anyhow!("invalid pair '{}': missing key", pair));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs("app:web, tier:frontend,empty:").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("app".to_string(), "web".to_string()),
                ("tier".to_string(), "frontend".to_string()),
                ("empty".to_string(), String::new()),
            ]
        );
        assert!(parse_pairs(":nokey").is_err());
        assert!(parse_pairs("").unwrap().is_empty());
    }

    #[test]
    fn test_reorder_maps_to_sort_order() {
        assert_eq!(SortOrder::from(Reorder::None), SortOrder::Fifo);
        assert_eq!(SortOrder::from(Reorder::Legacy), SortOrder::Legacy);
    }
}
