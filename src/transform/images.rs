//! Image transformer
//!
//! Rewrites the `image` of every container whose image name matches an
//! override. Containers are found by walking the whole document, so custom
//! resources that embed pod specs are covered too.

use serde_yaml::Value as YamlValue;

use crate::error::Result;
use crate::kustomization::ImageOverride;
use crate::resmap::ResourceMap;

use super::Transformer;

const CONTAINER_FIELDS: &[&str] = &["containers", "initContainers", "ephemeralContainers"];

/// An image reference split into name, tag and digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// `[registry[:port]/]path`
    pub name: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageRef {
    /// Parse `[registry[:port]/]path[:tag][@digest]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use overkube::transform::images::ImageRef;
    ///
    /// let image = ImageRef::parse("registry.local:5000/team/app:1.2");
    /// assert_eq!(image.name, "registry.local:5000/team/app");
    /// assert_eq!(image.tag.as_deref(), Some("1.2"));
    /// ```
    pub fn parse(image: &str) -> Self {
        let (rest, digest) = match image.split_once('@') {
            Some((rest, digest)) => (rest, Some(digest.to_string())),
            None => (image, None),
        };
        let name_start = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match rest[name_start..].rfind(':') {
            Some(i) => {
                let split = name_start + i;
                (rest[..split].to_string(), Some(rest[split + 1..].to_string()))
            }
            None => (rest.to_string(), None),
        };
        Self { name, tag, digest }
    }

    /// Apply an override: `newName` replaces the name, a digest wins over a
    /// tag, and with neither the current tag and digest are kept.
    pub fn apply(&self, over: &ImageOverride) -> String {
        let name = over
            .new_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name);
        if let Some(digest) = over.digest.as_deref().filter(|d| !d.is_empty()) {
            return format!("{}@{}", name, digest);
        }
        if let Some(tag) = over.new_tag.as_deref().filter(|t| !t.is_empty()) {
            return format!("{}:{}", name, tag);
        }
        let mut out = name.to_string();
        if let Some(tag) = &self.tag {
            out.push(':');
            out.push_str(tag);
        }
        if let Some(digest) = &self.digest {
            out.push('@');
            out.push_str(digest);
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct ImageTransformer {
    overrides: Vec<ImageOverride>,
}

impl ImageTransformer {
    pub fn new(overrides: Vec<ImageOverride>) -> Self {
        Self { overrides }
    }

    fn rewrite(&self, image: &str) -> Option<String> {
        let parsed = ImageRef::parse(image);
        self.overrides
            .iter()
            .find(|o| o.name == parsed.name)
            .map(|o| parsed.apply(o))
    }

    fn visit(&self, value: &mut YamlValue) {
        match value {
            YamlValue::Mapping(map) => {
                for (key, child) in map.iter_mut() {
                    let is_container_list = key
                        .as_str()
                        .is_some_and(|k| CONTAINER_FIELDS.contains(&k));
                    if is_container_list {
                        if let YamlValue::Sequence(containers) = child {
                            for container in containers.iter_mut() {
                                self.rewrite_container(container);
                            }
                        }
                    }
                    self.visit(child);
                }
            }
            YamlValue::Sequence(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            _ => {}
        }
    }

    fn rewrite_container(&self, container: &mut YamlValue) {
        let Some(map) = container.as_mapping_mut() else {
            return;
        };
        let Some(image) = map.get("image").and_then(YamlValue::as_str) else {
            return;
        };
        if let Some(new_image) = self.rewrite(image) {
            map.insert("image".into(), YamlValue::String(new_image));
        }
    }
}

impl Transformer for ImageTransformer {
    fn name(&self) -> &'static str {
        "images"
    }

    fn transform(&self, resmap: &mut ResourceMap) -> Result<()> {
        for resource in resmap.iter_mut() {
            self.visit(resource.value_mut());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;

    fn over(name: &str, new_name: Option<&str>, tag: Option<&str>, digest: Option<&str>) -> ImageOverride {
        ImageOverride {
            name: name.to_string(),
            new_name: new_name.map(str::to_string),
            new_tag: tag.map(str::to_string),
            digest: digest.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_image_refs() {
        assert_eq!(
            ImageRef::parse("nginx"),
            ImageRef {
                name: "nginx".into(),
                tag: None,
                digest: None
            }
        );
        let r = ImageRef::parse("localhost:5000/app:v1@sha256:abc");
        assert_eq!(r.name, "localhost:5000/app");
        assert_eq!(r.tag.as_deref(), Some("v1"));
        assert_eq!(r.digest.as_deref(), Some("sha256:abc"));
        let r = ImageRef::parse("localhost:5000/app");
        assert_eq!(r.name, "localhost:5000/app");
        assert_eq!(r.tag, None);
    }

    #[test]
    fn test_apply_rules() {
        let image = ImageRef::parse("nginx:1.0");
        assert_eq!(image.apply(&over("nginx", None, Some("1.25"), None)), "nginx:1.25");
        assert_eq!(
            image.apply(&over("nginx", Some("my/nginx"), None, None)),
            "my/nginx:1.0"
        );
        assert_eq!(
            image.apply(&over("nginx", None, Some("1.25"), Some("sha256:x"))),
            "nginx@sha256:x"
        );
    }

    #[test]
    fn test_transform_rewrites_all_container_lists() {
        let doc = r#"
apiVersion: batch/v1
kind: CronJob
metadata:
  name: nightly
spec:
  jobTemplate:
    spec:
      template:
        spec:
          initContainers:
            - name: init
              image: busybox
          containers:
            - name: main
              image: nginx:1.0
            - name: side
              image: nginx-exporter:2
"#;
        let mut map: ResourceMap = vec![Resource::from_yaml(doc).unwrap()].into_iter().collect();
        ImageTransformer::new(vec![
            over("nginx", None, Some("1.25"), None),
            over("busybox", Some("registry.local/busybox"), None, None),
        ])
        .transform(&mut map)
        .unwrap();
        let spec = &map.get(0).unwrap().value()["spec"]["jobTemplate"]["spec"]["template"]["spec"];
        assert_eq!(spec["containers"][0]["image"], YamlValue::from("nginx:1.25"));
        assert_eq!(spec["containers"][1]["image"], YamlValue::from("nginx-exporter:2"));
        assert_eq!(
            spec["initContainers"][0]["image"],
            YamlValue::from("registry.local/busybox")
        );
    }
}
