//! Name reference fixing
//!
//! When a resource is renamed (prefix, suffix, hash), fields in other
//! resources that refer to it by name must follow. Each [`Referral`] kind
//! lists the referrer fields that can name it. A referrer field is rewritten
//! when its value is a former name of exactly one resource of the referral
//! kind.

use log::{debug, warn};
use serde_yaml::Value as YamlValue;

use crate::error::Result;
use crate::resmap::ResourceMap;
use crate::resource::shared_tail;

use super::fieldspec::{apply_to_path, POD_SPECS};

/// A referrer field. `kind` restricts the referrer; `None` means any
/// pod-spec carrying kind, with `path` relative to the pod spec.
#[derive(Debug, Clone, Copy)]
struct Referrer {
    kind: Option<&'static str>,
    path: &'static str,
}

const fn pod(path: &'static str) -> Referrer {
    Referrer { kind: None, path }
}

const fn of(kind: &'static str, path: &'static str) -> Referrer {
    Referrer {
        kind: Some(kind),
        path,
    }
}

struct Referral {
    kind: &'static str,
    referrers: &'static [Referrer],
}

const REFERRALS: &[Referral] = &[
    Referral {
        kind: "ConfigMap",
        referrers: &[
            pod("volumes/configMap/name"),
            pod("volumes/projected/sources/configMap/name"),
            pod("containers/env/valueFrom/configMapKeyRef/name"),
            pod("initContainers/env/valueFrom/configMapKeyRef/name"),
            pod("containers/envFrom/configMapRef/name"),
            pod("initContainers/envFrom/configMapRef/name"),
        ],
    },
    Referral {
        kind: "Secret",
        referrers: &[
            pod("volumes/secret/secretName"),
            pod("volumes/projected/sources/secret/name"),
            pod("containers/env/valueFrom/secretKeyRef/name"),
            pod("initContainers/env/valueFrom/secretKeyRef/name"),
            pod("containers/envFrom/secretRef/name"),
            pod("initContainers/envFrom/secretRef/name"),
            pod("imagePullSecrets/name"),
            of("ServiceAccount", "secrets/name"),
            of("ServiceAccount", "imagePullSecrets/name"),
            of("Ingress", "spec/tls/secretName"),
        ],
    },
    Referral {
        kind: "ServiceAccount",
        referrers: &[
            pod("serviceAccountName"),
            of("RoleBinding", "subjects/name"),
            of("ClusterRoleBinding", "subjects/name"),
        ],
    },
    Referral {
        kind: "PersistentVolumeClaim",
        referrers: &[pod("volumes/persistentVolumeClaim/claimName")],
    },
    Referral {
        kind: "Service",
        referrers: &[
            of("StatefulSet", "spec/serviceName"),
            of("Ingress", "spec/rules/http/paths/backend/service/name"),
            of("Ingress", "spec/defaultBackend/service/name"),
            of("Ingress", "spec/rules/http/paths/backend/serviceName"),
            of("Ingress", "spec/backend/serviceName"),
        ],
    },
    Referral {
        kind: "Role",
        referrers: &[of("RoleBinding", "roleRef/name")],
    },
    Referral {
        kind: "ClusterRole",
        referrers: &[
            of("RoleBinding", "roleRef/name"),
            of("ClusterRoleBinding", "roleRef/name"),
        ],
    },
    Referral {
        kind: "Deployment",
        referrers: &[of("HorizontalPodAutoscaler", "spec/scaleTargetRef/name")],
    },
    Referral {
        kind: "StatefulSet",
        referrers: &[of("HorizontalPodAutoscaler", "spec/scaleTargetRef/name")],
    },
];

/// Snapshot of one referral resource: its current name and namespace,
/// every name it has had, and the kustomizations it was built through.
#[derive(Debug)]
struct Candidate {
    name: String,
    namespace: Option<String>,
    former_names: Vec<String>,
    lineage: Vec<String>,
}

impl Candidate {
    fn effective_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("default")
    }
}

/// Decide the new value for a referrer field holding `value`.
///
/// Candidates in the referrer's namespace win. Among several, the one built
/// in the same branch as the referrer (the longest shared lineage) wins.
fn resolve<'a>(
    candidates: &'a [Candidate],
    value: &str,
    namespace: &str,
    lineage: &[String],
) -> Option<&'a str> {
    // A field already naming a live resource stays as it is.
    if candidates.iter().any(|c| c.name == value) {
        return None;
    }
    let matching: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.former_names.iter().any(|n| n == value))
        .collect();
    let preferred: Vec<&Candidate> = matching
        .iter()
        .copied()
        .filter(|c| c.effective_namespace() == namespace)
        .collect();
    let pool = if preferred.is_empty() { &matching } else { &preferred };
    match pool.as_slice() {
        [] => None,
        [only] => Some(only.name.as_str()),
        _ => {
            let depth = |c: &Candidate| shared_tail(&c.lineage, lineage);
            let best = pool.iter().map(|c| depth(c)).max().unwrap_or_default();
            let closest: Vec<&&Candidate> = pool.iter().filter(|c| depth(c) == best).collect();
            if let [only] = closest.as_slice() {
                return Some(only.name.as_str());
            }
            warn!(
                "'{}' could refer to {} resources; leaving it unchanged",
                value,
                closest.len()
            );
            None
        }
    }
}

/// Rewrite referrer fields to the current names of the resources they
/// refer to.
pub fn fix(resmap: &mut ResourceMap) -> Result<()> {
    for referral in REFERRALS {
        let candidates: Vec<Candidate> = resmap
            .iter()
            .filter(|r| r.kind() == referral.kind)
            .map(|r| Candidate {
                name: r.name().to_string(),
                namespace: r.namespace().map(str::to_string),
                former_names: r.id_history().iter().map(|id| id.name.clone()).collect(),
                lineage: r.lineage().to_vec(),
            })
            .collect();
        if candidates.iter().all(|c| c.former_names.len() <= 1) {
            continue;
        }

        for resource in resmap.iter_mut() {
            let kind = resource.kind().to_string();
            let namespace = resource
                .namespace()
                .unwrap_or("default")
                .to_string();
            let lineage = resource.lineage().to_vec();
            let paths = referrer_paths(referral, &kind);
            if paths.is_empty() {
                continue;
            }
            for path in paths {
                let Some((field, parent)) = path.split_last() else {
                    continue;
                };
                apply_to_path(resource.value_mut(), parent, false, &mut |slot| {
                    let Some(map) = slot.as_mapping_mut() else {
                        return Ok(());
                    };
                    // Typed references (roleRef, subjects, scaleTargetRef)
                    // only match their own kind.
                    if let Some(ref_kind) = map.get("kind").and_then(YamlValue::as_str) {
                        if ref_kind != referral.kind {
                            return Ok(());
                        }
                    }
                    let ref_namespace = map
                        .get("namespace")
                        .and_then(YamlValue::as_str)
                        .unwrap_or(&namespace)
                        .to_string();
                    let Some(current) = map.get(field.as_str()).and_then(YamlValue::as_str) else {
                        return Ok(());
                    };
                    if let Some(new_name) = resolve(&candidates, current, &ref_namespace, &lineage) {
                        debug!(
                            "{} {}: {} reference '{}' -> '{}'",
                            kind, field, referral.kind, current, new_name
                        );
                        let new_name = new_name.to_string();
                        map.insert(field.as_str().into(), YamlValue::String(new_name));
                    }
                    Ok(())
                })?;
            }
        }
    }
    Ok(())
}

/// Segmented paths of the referrer fields of `referral` inside a resource of
/// `kind`.
fn referrer_paths(referral: &Referral, kind: &str) -> Vec<Vec<String>> {
    let mut paths = Vec::new();
    for referrer in referral.referrers {
        match referrer.kind {
            Some(k) if k == kind => paths.push(crate::merge::parse_field_path(referrer.path)),
            Some(_) => {}
            None => {
                for (pod_kind, prefix) in POD_SPECS {
                    if *pod_kind == kind {
                        paths.push(crate::merge::parse_field_path(&format!(
                            "{}/{}",
                            prefix, referrer.path
                        )));
                    }
                }
            }
        }
    }
    paths
}
