//! Restricted file loading relative to a kustomization directory
//!
//! Every file a descriptor names (resources, patches, generator sources) is
//! resolved against the directory holding the descriptor and read through a
//! [`Loader`], which enforces the [`LoadRestrictor`] and rejects remote
//! references.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::path::{is_remote, is_within, join_relative};

/// Where files named by a descriptor may live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadRestrictor {
    /// Files must be in or below the descriptor's directory.
    #[default]
    RootOnly,
    /// No restriction.
    None,
}

impl FromStr for LoadRestrictor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "root-only" | "LoadRestrictionsRootOnly" => Ok(LoadRestrictor::RootOnly),
            "none" | "LoadRestrictionsNone" => Ok(LoadRestrictor::None),
            other => Err(Error::Path {
                message: format!(
                    "unknown load restrictor '{}' (expected root-only or none)",
                    other
                ),
            }),
        }
    }
}

impl fmt::Display for LoadRestrictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadRestrictor::RootOnly => write!(f, "root-only"),
            LoadRestrictor::None => write!(f, "none"),
        }
    }
}

/// Reads files named by one kustomization.
#[derive(Clone, Copy)]
pub struct Loader<'a> {
    fs: &'a dyn FileSystem,
    dir: &'a Path,
    restrictor: LoadRestrictor,
}

impl fmt::Debug for Loader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("dir", &self.dir)
            .field("restrictor", &self.restrictor)
            .finish()
    }
}

impl<'a> Loader<'a> {
    pub fn new(fs: &'a dyn FileSystem, dir: &'a Path, restrictor: LoadRestrictor) -> Self {
        Self {
            fs,
            dir,
            restrictor,
        }
    }

    pub fn fs(&self) -> &'a dyn FileSystem {
        self.fs
    }

    pub fn dir(&self) -> &'a Path {
        self.dir
    }

    pub fn restrictor(&self) -> LoadRestrictor {
        self.restrictor
    }

    /// Resolve an entry to a local path, rejecting remote references.
    pub fn resolve(&self, entry: &str) -> Result<PathBuf> {
        if is_remote(entry) {
            return Err(Error::RemoteResource {
                reference: entry.to_string(),
            });
        }
        Ok(join_relative(self.dir, entry))
    }

    /// Fail if `path` may not be read under the current restrictor.
    pub fn check_restriction(&self, path: &Path) -> Result<()> {
        if self.restrictor == LoadRestrictor::None {
            return Ok(());
        }
        let root = self.fs.canonicalize(self.dir)?;
        let target = self.fs.canonicalize(path)?;
        if is_within(&root, &target) {
            Ok(())
        } else {
            Err(Error::LoadRestriction {
                file: path.display().to_string(),
                root: self.dir.display().to_string(),
                hint: Some(
                    "move the file under the kustomization directory or build with --load-restrictor none"
                        .to_string(),
                ),
            })
        }
    }

    /// Resolve, check and read an entry.
    pub fn load_bytes(&self, entry: &str) -> Result<Vec<u8>> {
        let path = self.resolve(entry)?;
        if !self.fs.is_file(&path) {
            return Err(Error::Filesystem {
                message: format!(
                    "'{}' (from {}) does not exist or is not a file",
                    entry,
                    self.dir.display()
                ),
            });
        }
        self.check_restriction(&path)?;
        self.fs.read_file(&path)
    }

    /// Resolve, check and read an entry as UTF-8 text.
    pub fn load_string(&self, entry: &str) -> Result<String> {
        let bytes = self.load_bytes(entry)?;
        String::from_utf8(bytes).map_err(|_| Error::Filesystem {
            message: format!("'{}' is not valid UTF-8", entry),
        })
    }
}
