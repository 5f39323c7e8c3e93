//! Path manipulation utilities for overkube

use crate::error::Result;
use glob::Pattern;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Lexically normalize a path: drop `.` components and fold `dir/..` pairs.
///
/// Leading `..` components of a relative path are kept. The result of
/// cleaning `.` is the empty path.
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Resolve a descriptor entry relative to the directory holding the
/// descriptor.
pub fn join_relative(dir: &Path, entry: &str) -> PathBuf {
    clean(&dir.join(entry))
}

/// Whether `path` is `root` itself or lies below it. Both paths must already
/// be in canonical form.
pub fn is_within(root: &Path, path: &Path) -> bool {
    path.starts_with(root)
}

/// Whether a resource entry refers to a remote location rather than a local
/// path.
///
/// Recognizes anything with a URL scheme (`https://`, `ssh://`, `git::`),
/// scp-style `git@host:` references, and the hosting shorthand forms such as
/// `github.com/org/repo`.
pub fn is_remote(reference: &str) -> bool {
    if reference.starts_with("git@") || reference.starts_with("git::") {
        return true;
    }
    const HOST_SHORTHANDS: [&str; 3] = ["github.com/", "gitlab.com/", "bitbucket.org/"];
    if HOST_SHORTHANDS.iter().any(|h| reference.starts_with(h)) {
        return true;
    }
    match Url::parse(reference) {
        // Single-letter schemes are Windows drive letters, not URLs.
        Ok(url) => url.scheme().len() > 1,
        Err(_) => false,
    }
}

/// Match a path against a glob pattern
pub fn glob_match(pattern: &str, path: &str) -> Result<bool> {
    let pattern = Pattern::new(pattern)?;
    Ok(pattern.matches(path))
}

/// Make a string safe to use as a single file-name component.
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect()
}

/// File name used when a build is written to a directory: one file per
/// resource, `<group>_<version>_<kind>_<name>.yaml`, lowercased. An empty
/// group is left out.
pub fn resource_file_name(group: &str, version: &str, kind: &str, name: &str) -> String {
    let parts: Vec<&str> = [group, version, kind, name]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    format!("{}.yaml", sanitize_component(&parts.join("_")).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(clean(Path::new("./a")), PathBuf::from("a"));
        assert_eq!(clean(Path::new(".")), PathBuf::from(""));
        assert_eq!(clean(Path::new("../a/b/..")), PathBuf::from("../a"));
        assert_eq!(clean(Path::new("/a/../../b")), PathBuf::from("/b"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(
            join_relative(Path::new("overlays/prod"), "../../base"),
            PathBuf::from("base")
        );
        assert_eq!(
            join_relative(Path::new("base"), "deployment.yaml"),
            PathBuf::from("base/deployment.yaml")
        );
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("/work/base"), Path::new("/work/base/a.yaml")));
        assert!(is_within(Path::new("/work/base"), Path::new("/work/base")));
        assert!(!is_within(Path::new("/work/base"), Path::new("/work/base2/a.yaml")));
        assert!(!is_within(Path::new("/work/base"), Path::new("/work/a.yaml")));
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://github.com/org/repo//base?ref=v1"));
        assert!(is_remote("github.com/org/repo/base"));
        assert!(is_remote("git@github.com:org/repo.git"));
        assert!(is_remote("ssh://git@example.com/repo.git"));
        assert!(!is_remote("../base"));
        assert!(!is_remote("deployment.yaml"));
        assert!(!is_remote("C:/manifests/base"));
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.yaml", "deployment.yaml").unwrap());
        assert!(!glob_match("*.yaml", "deployment.yml").unwrap());
        assert!(glob_match("**/*.yaml", "base/svc.yaml").unwrap());
    }

    #[test]
    fn test_resource_file_name() {
        assert_eq!(
            resource_file_name("apps", "v1", "Deployment", "web"),
            "apps_v1_deployment_web.yaml"
        );
        assert_eq!(
            resource_file_name("", "v1", "Service", "web"),
            "v1_service_web.yaml"
        );
        assert_eq!(
            resource_file_name("rbac.authorization.k8s.io", "v1", "Role", "a:b"),
            "rbac.authorization.k8s.io_v1_role_a_b.yaml"
        );
    }
}
