//! Path mapping for project-relative references
//!
//! Plugins refer to project files with logical, root-relative paths such as
//! `src/features` or `!src/legacy.js`. This module resolves those references
//! against the current project root without touching the filesystem.

use std::path::{Component, Path, PathBuf};

/// Resolves logical file references to absolute paths.
pub trait PathMapper {
    /// Map a logical reference to an absolute path.
    ///
    /// Absolute references are returned as-is (normalized); relative ones are
    /// interpreted relative to the project root.
    fn to_absolute(&self, logical: &str) -> PathBuf;
}

/// [`PathMapper`] rooted at a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    /// Create a mapper for the given project root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathMapper for ProjectPaths {
    fn to_absolute(&self, logical: &str) -> PathBuf {
        let target = Path::new(logical);
        let joined = if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.root.join(target)
        };
        normalize_path(&joined)
    }
}

/// Lexically resolve `.` and `..` components.
///
/// Unlike `canonicalize`, this works for paths that do not exist, which is
/// exactly the case feature-file probes need to answer.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            _ => normalized.push(component),
        }
    }

    normalized
}
