//! Namespace transformer

use serde_yaml::Value as YamlValue;

use crate::error::Result;
use crate::merge::yaml::get_str;
use crate::resmap::ResourceMap;
use crate::resource::Resource;

use super::fieldspec::apply_to_path;
use super::Transformer;

const BINDING_KINDS: &[&str] = &["RoleBinding", "ClusterRoleBinding"];
const WEBHOOK_KINDS: &[&str] = &[
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
];

/// Moves every namespaced resource into one namespace.
///
/// Cluster-scoped resources keep no namespace. Binding subjects and webhook
/// service references that point at a resource of this build follow it.
#[derive(Debug, Clone)]
pub struct NamespaceTransformer {
    namespace: String,
}

impl NamespaceTransformer {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

/// Every (name, namespace) pair a resource of `kind` has had.
fn identities(resmap: &ResourceMap, kind: &str) -> Vec<(String, Option<String>)> {
    resmap
        .iter()
        .filter(|r| r.kind() == kind)
        .flat_map(|r| r.id_history().iter())
        .map(|id| (id.name.clone(), id.namespace.clone()))
        .collect()
}

fn references(identities: &[(String, Option<String>)], name: &str, namespace: Option<&str>) -> bool {
    identities.iter().any(|(n, ns)| {
        let ns = ns.as_deref().unwrap_or("default");
        n == name && namespace.is_none_or(|wanted| wanted == ns)
    })
}

impl Transformer for NamespaceTransformer {
    fn name(&self) -> &'static str {
        "namespace"
    }

    fn transform(&self, resmap: &mut ResourceMap) -> Result<()> {
        let service_accounts = identities(resmap, "ServiceAccount");
        let services = identities(resmap, "Service");

        for resource in resmap.iter_mut() {
            if !resource.gvk().is_cluster_scoped() {
                resource.set_namespace(Some(&self.namespace))?;
            }
            let kind = resource.kind().to_string();
            if BINDING_KINDS.contains(&kind.as_str()) {
                self.fix_subjects(resource, &service_accounts)?;
            }
            if WEBHOOK_KINDS.contains(&kind.as_str()) {
                self.fix_webhook_services(resource, &services)?;
            }
        }
        Ok(())
    }
}

impl NamespaceTransformer {
    fn fix_subjects(
        &self,
        resource: &mut Resource,
        service_accounts: &[(String, Option<String>)],
    ) -> Result<()> {
        let path = vec!["subjects".to_string()];
        let namespace = self.namespace.clone();
        apply_to_path(resource.value_mut(), &path, false, &mut |subject| {
            let Some(map) = subject.as_mapping_mut() else {
                return Ok(());
            };
            if map.get("kind").and_then(YamlValue::as_str) != Some("ServiceAccount") {
                return Ok(());
            }
            let name = map.get("name").and_then(YamlValue::as_str).unwrap_or_default();
            let current_ns = map.get("namespace").and_then(YamlValue::as_str);
            if references(service_accounts, name, current_ns) {
                map.insert("namespace".into(), YamlValue::String(namespace.clone()));
            }
            Ok(())
        })
    }

    fn fix_webhook_services(
        &self,
        resource: &mut Resource,
        services: &[(String, Option<String>)],
    ) -> Result<()> {
        let path = vec![
            "webhooks".to_string(),
            "clientConfig".to_string(),
            "service".to_string(),
        ];
        let namespace = self.namespace.clone();
        apply_to_path(resource.value_mut(), &path, false, &mut |service| {
            let name = get_str(service, &["name"]).unwrap_or_default().to_string();
            let current_ns = get_str(service, &["namespace"]).map(str::to_string);
            if let Some(map) = service.as_mapping_mut() {
                if references(services, &name, current_ns.as_deref()) {
                    map.insert("namespace".into(), YamlValue::String(namespace.clone()));
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resmap(docs: &[&str]) -> ResourceMap {
        docs.iter().map(|d| Resource::from_yaml(d).unwrap()).collect()
    }

    #[test]
    fn test_sets_and_overwrites_namespace() {
        let mut map = resmap(&[
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: b\n  namespace: old\n",
        ]);
        NamespaceTransformer::new("prod").transform(&mut map).unwrap();
        assert!(map.iter().all(|r| r.namespace() == Some("prod")));
        assert_eq!(map.get(1).unwrap().id_history()[0].namespace.as_deref(), Some("old"));
    }

    #[test]
    fn test_skips_cluster_scoped() {
        let mut map = resmap(&[
            "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: prod\n",
            "apiVersion: rbac.authorization.k8s.io/v1\nkind: ClusterRole\nmetadata:\n  name: reader\n",
        ]);
        NamespaceTransformer::new("prod").transform(&mut map).unwrap();
        assert!(map.iter().all(|r| r.namespace().is_none()));
    }

    #[test]
    fn test_binding_subjects_follow_service_account() {
        let mut map = resmap(&[
            "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: app\n",
            r#"
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRoleBinding
metadata:
  name: app
subjects:
  - kind: ServiceAccount
    name: app
    namespace: default
  - kind: ServiceAccount
    name: other
    namespace: kube-system
  - kind: User
    name: app
roleRef:
  kind: ClusterRole
  name: reader
"#,
        ]);
        NamespaceTransformer::new("prod").transform(&mut map).unwrap();
        let binding = map.get(1).unwrap().value();
        assert_eq!(binding["subjects"][0]["namespace"], YamlValue::from("prod"));
        assert_eq!(
            binding["subjects"][1]["namespace"],
            YamlValue::from("kube-system")
        );
        assert!(binding["subjects"][2].get("namespace").is_none());
        assert!(map.get(1).unwrap().namespace().is_none());
    }

    #[test]
    fn test_webhook_service_namespace() {
        let mut map = resmap(&[
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: hook\n",
            r#"
apiVersion: admissionregistration.k8s.io/v1
kind: ValidatingWebhookConfiguration
metadata:
  name: hook
webhooks:
  - name: check.example.com
    clientConfig:
      service:
        name: hook
        namespace: default
"#,
        ]);
        NamespaceTransformer::new("prod").transform(&mut map).unwrap();
        let hook = map.get(1).unwrap().value();
        assert_eq!(
            hook["webhooks"][0]["clientConfig"]["service"]["namespace"],
            YamlValue::from("prod")
        );
    }
}
