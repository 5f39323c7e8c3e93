//! Filesystem abstraction used by the loader
//!
//! The build pipeline never touches `std::fs` directly. It reads through the
//! [`FileSystem`] trait so that the same code can run against the real disk
//! ([`DiskFS`]) or an in-memory tree ([`MemoryFS`]) in tests and benchmarks.

use crate::error::{Error, Result};
use crate::path::clean;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Read-only view of a directory tree.
pub trait FileSystem: Send + Sync {
    /// Read a file's full content.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Whether `path` names a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Whether `path` names a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Resolve `path` to the form used for identity comparisons (cycle
    /// detection, load restrictions).
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    /// Read a file as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).map_err(|_| Error::Filesystem {
            message: format!("File '{}' is not valid UTF-8", path.display()),
        })
    }
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFS;

impl FileSystem for DiskFS {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| Error::Filesystem {
            message: format!("Failed to read '{}': {}", path.display(), e),
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        std::fs::canonicalize(path).map_err(|e| Error::Path {
            message: format!("Failed to resolve '{}': {}", path.display(), e),
        })
    }
}

/// Represents a file with content
#[derive(Debug, Clone)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }
}

/// In-memory filesystem. Paths are stored cleaned and relative; directories
/// exist implicitly as prefixes of stored file paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryFS {
    files: BTreeMap<PathBuf, File>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, file: File) -> Result<()> {
        let path = clean(path.as_ref());
        if path.as_os_str().is_empty() {
            return Err(Error::Filesystem {
                message: "Cannot add a file at the filesystem root".to_string(),
            });
        }
        self.files.insert(path, file);
        Ok(())
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<Path>>(&mut self, path: P, content: &str) -> Result<()> {
        self.add_file(path, File::from_string(content))
    }

    /// Get a file by path
    pub fn get_file<P: AsRef<Path>>(&self, path: P) -> Option<&File> {
        self.files.get(&clean(path.as_ref()))
    }

    /// Check if a file exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.contains_key(&clean(path.as_ref()))
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSystem for MemoryFS {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.get_file(path)
            .map(|f| f.content.clone())
            .ok_or_else(|| Error::Filesystem {
                message: format!("File not found: {}", path.display()),
            })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let dir = clean(path);
        if dir.as_os_str().is_empty() {
            return !self.files.is_empty();
        }
        self.files
            .keys()
            .any(|file| file != &dir && file.starts_with(&dir))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(clean(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_fs_add_and_read() {
        let mut fs = MemoryFS::new();
        fs.add_file_string("base/deployment.yaml", "kind: Deployment")
            .unwrap();
        assert!(fs.exists("base/deployment.yaml"));
        assert_eq!(
            fs.read_to_string(Path::new("base/deployment.yaml")).unwrap(),
            "kind: Deployment"
        );
        assert_eq!(fs.len(), 1);
    }

    #[test]
    fn test_memory_fs_paths_are_cleaned() {
        let mut fs = MemoryFS::new();
        fs.add_file_string("./base/../base/svc.yaml", "kind: Service")
            .unwrap();
        assert!(fs.exists("base/svc.yaml"));
        assert!(fs.is_file(Path::new("overlays/../base/svc.yaml")));
    }

    #[test]
    fn test_memory_fs_implicit_directories() {
        let mut fs = MemoryFS::new();
        fs.add_file_string("overlays/prod/kustomization.yaml", "")
            .unwrap();
        assert!(fs.is_dir(Path::new("overlays")));
        assert!(fs.is_dir(Path::new("overlays/prod")));
        assert!(!fs.is_dir(Path::new("overlays/prod/kustomization.yaml")));
        assert!(!fs.is_dir(Path::new("overlays/staging")));
        assert!(fs.is_dir(Path::new(".")));
    }

    #[test]
    fn test_memory_fs_dir_prefix_is_component_wise() {
        let mut fs = MemoryFS::new();
        fs.add_file_string("base-extra/a.yaml", "").unwrap();
        assert!(!fs.is_dir(Path::new("base")));
    }

    #[test]
    fn test_memory_fs_read_missing() {
        let fs = MemoryFS::new();
        let err = fs.read_file(Path::new("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_memory_fs_read_invalid_utf8() {
        let mut fs = MemoryFS::new();
        fs.add_file("blob.bin", File::new(vec![0xff, 0xfe])).unwrap();
        assert!(fs.read_to_string(Path::new("blob.bin")).is_err());
        assert_eq!(fs.read_file(Path::new("blob.bin")).unwrap().len(), 2);
    }

    #[test]
    fn test_memory_fs_rejects_root_file() {
        let mut fs = MemoryFS::new();
        assert!(fs.add_file_string(".", "x").is_err());
    }

    #[test]
    fn test_disk_fs_reads_and_canonicalizes() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("cm.yaml");
        std::fs::write(&file, "kind: ConfigMap").unwrap();

        let fs = DiskFS;
        assert!(fs.is_file(&file));
        assert!(fs.is_dir(temp.path()));
        assert_eq!(fs.read_to_string(&file).unwrap(), "kind: ConfigMap");

        let dotted = temp.path().join(".").join("cm.yaml");
        assert_eq!(
            fs.canonicalize(&dotted).unwrap(),
            fs.canonicalize(&file).unwrap()
        );
    }

    #[test]
    fn test_disk_fs_missing_file() {
        let temp = TempDir::new().unwrap();
        let fs = DiskFS;
        assert!(fs.read_file(&temp.path().join("nope.yaml")).is_err());
        assert!(fs.canonicalize(&temp.path().join("nope")).is_err());
    }
}
