//! Phase 3: Ordering
//!
//! Puts the final resources in output order.
//!
//! - **legacy**: resources whose kind must exist before others are applied
//!   (namespaces, RBAC, config) come first, webhook configurations come last,
//!   and everything else sits in between. Ties break on the resource id, so
//!   the result never depends on accumulation order.
//! - **fifo**: accumulation order is kept.

use std::cmp::Ordering;

use crate::kustomization::{Kustomization, LegacySortOptions, SortOrder};
use crate::resmap::ResourceMap;
use crate::resource::Resource;

/// Kinds emitted first by the legacy order, in this order.
pub const LEGACY_ORDER_FIRST: &[&str] = &[
    "Namespace",
    "ResourceQuota",
    "StorageClass",
    "CustomResourceDefinition",
    "ServiceAccount",
    "PodSecurityPolicy",
    "Role",
    "ClusterRole",
    "RoleBinding",
    "ClusterRoleBinding",
    "ConfigMap",
    "Secret",
    "Endpoints",
    "Service",
    "LimitRange",
    "PriorityClass",
    "PersistentVolume",
    "PersistentVolumeClaim",
    "Deployment",
    "StatefulSet",
    "CronJob",
    "PodDisruptionBudget",
];

/// Kinds emitted last by the legacy order, in this order.
pub const LEGACY_ORDER_LAST: &[&str] = &[
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
];

/// Resolved ordering for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputOrder {
    Fifo,
    Legacy { first: Vec<String>, last: Vec<String> },
}

impl OutputOrder {
    /// The default legacy order.
    pub fn legacy() -> Self {
        OutputOrder::Legacy {
            first: LEGACY_ORDER_FIRST.iter().map(|k| k.to_string()).collect(),
            last: LEGACY_ORDER_LAST.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// The order asked for by the root kustomization, unless `reorder`
    /// overrides it.
    pub fn resolve(kustomization: &Kustomization, reorder: Option<SortOrder>) -> Self {
        let sort_options = kustomization.sort_options.as_ref();
        let order = reorder.unwrap_or_else(|| sort_options.map(|o| o.order).unwrap_or_default());
        match order {
            SortOrder::Fifo => OutputOrder::Fifo,
            SortOrder::Legacy => match sort_options.and_then(|o| o.legacy_sort_options.as_ref()) {
                Some(LegacySortOptions {
                    order_first,
                    order_last,
                }) if reorder.is_none() => OutputOrder::Legacy {
                    first: order_first.clone(),
                    last: order_last.clone(),
                },
                _ => OutputOrder::legacy(),
            },
        }
    }
}

/// Execute Phase 3: order the resources of a finished build.
pub fn execute(resmap: ResourceMap, order: &OutputOrder) -> Vec<Resource> {
    let mut resources = resmap.into_resources();
    if let OutputOrder::Legacy { first, last } = order {
        let rank = |kind: &str| -> usize {
            if let Some(i) = first.iter().position(|k| k == kind) {
                i
            } else if let Some(i) = last.iter().position(|k| k == kind) {
                first.len() + 1 + i
            } else {
                first.len()
            }
        };
        let mut keyed: Vec<(usize, String, Resource)> = resources
            .into_iter()
            .map(|r| (rank(r.kind()), r.id().to_string(), r))
            .collect();
        keyed.sort_by(|a, b| match a.0.cmp(&b.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });
        resources = keyed.into_iter().map(|(_, _, r)| r).collect();
    }
    resources
}
