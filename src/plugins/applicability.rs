//! Project applicability checks for plugins
//!
//! A plugin may declare `featureFiles` in its manifest: paths, relative to
//! the project root, that must exist (`"src/features"`) or must not exist
//! (`"!src/legacy.js"`) for the plugin to apply to the current project.
//! A plugin that fails the check is dropped before it reaches the registry.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::config::PathMapper;
use crate::error::{PluginError, Result};

/// One feature-file requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureFile<'a> {
    /// The path must exist.
    Present(&'a str),
    /// The path must not exist (`!`-prefixed pattern).
    Absent(&'a str),
}

impl<'a> FeatureFile<'a> {
    /// Parse one pattern.
    pub fn parse(pattern: &'a str) -> Self {
        match pattern.strip_prefix('!') {
            Some(path) => FeatureFile::Absent(path),
            None => FeatureFile::Present(pattern),
        }
    }

    /// Probe the filesystem through `paths`.
    pub fn holds(&self, paths: &dyn PathMapper) -> bool {
        match self {
            FeatureFile::Present(p) => paths.to_absolute(p).exists(),
            FeatureFile::Absent(p) => !paths.to_absolute(p).exists(),
        }
    }
}

/// Extract feature-file patterns from a raw manifest value.
///
/// Anything but a list means "no requirements" (`Ok(None)`); a list with a
/// non-string entry is a malformed manifest.
pub fn feature_patterns(value: Option<&Value>, plugin_dir: &Path) -> Result<Option<Vec<String>>> {
    let Some(Value::Array(entries)) = value else {
        return Ok(None);
    };

    entries
        .iter()
        .map(|entry| {
            entry.as_str().map(str::to_string).ok_or_else(|| {
                PluginError::invalid(
                    plugin_dir,
                    format!("featureFiles entries must be strings, got {}", entry),
                )
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Whether every feature-file requirement holds for the current project.
///
/// `None` (no list declared) is always applicable; an empty list is too.
pub fn is_applicable(feature_files: Option<&[String]>, paths: &dyn PathMapper) -> bool {
    let Some(patterns) = feature_files else {
        return true;
    };

    patterns.iter().all(|pattern| {
        let holds = FeatureFile::parse(pattern).holds(paths);
        if !holds {
            debug!(pattern = %pattern, "Feature file requirement not met");
        }
        holds
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectPaths;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectPaths) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src/features")).unwrap();
        fs::write(tmp.path().join("package.json"), "{}").unwrap();
        let paths = ProjectPaths::new(tmp.path());
        (tmp, paths)
    }

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn check(list: &[&str], paths: &ProjectPaths) -> bool {
        let owned = patterns(list);
        is_applicable(Some(owned.as_slice()), paths)
    }

    #[test]
    fn test_parse_patterns() {
        assert_eq!(FeatureFile::parse("src"), FeatureFile::Present("src"));
        assert_eq!(FeatureFile::parse("!src"), FeatureFile::Absent("src"));
        assert_eq!(
            FeatureFile::parse("src/a!b"),
            FeatureFile::Present("src/a!b")
        );
    }

    #[test]
    fn test_no_feature_files_is_applicable() {
        let (_tmp, paths) = project();
        assert!(is_applicable(None, &paths));
        assert!(check(&[], &paths));
    }

    #[test]
    fn test_present_requirement() {
        let (_tmp, paths) = project();
        assert!(check(&["src/features"], &paths));
        assert!(!check(&["src/routes"], &paths));
    }

    #[test]
    fn test_absent_requirement() {
        let (_tmp, paths) = project();
        assert!(check(&["!src/legacy.js"], &paths));
        assert!(!check(&["!package.json"], &paths));
    }

    #[test]
    fn test_all_requirements_must_hold() {
        let (_tmp, paths) = project();
        assert!(check(&["package.json", "src/features", "!src/legacy"], &paths));
        assert!(!check(&["package.json", "!src/features"], &paths));
    }

    #[test]
    fn test_feature_patterns_non_list_means_none() {
        let dir = Path::new("/plugins/p");
        assert_eq!(feature_patterns(None, dir).unwrap(), None);
        assert_eq!(feature_patterns(Some(&json!("src")), dir).unwrap(), None);
        assert_eq!(feature_patterns(Some(&json!({"a": 1})), dir).unwrap(), None);
        assert_eq!(feature_patterns(Some(&Value::Null), dir).unwrap(), None);
    }

    #[test]
    fn test_feature_patterns_list() {
        let dir = Path::new("/plugins/p");
        let parsed = feature_patterns(Some(&json!(["src", "!lib"])), dir).unwrap();
        assert_eq!(parsed, Some(patterns(&["src", "!lib"])));
    }

    #[test]
    fn test_feature_patterns_non_string_entry() {
        let dir = Path::new("/plugins/p");
        let err = feature_patterns(Some(&json!(["src", 42])), dir).unwrap_err();
        assert!(matches!(err, PluginError::InvalidManifest { .. }));
        assert!(err.to_string().contains("featureFiles"));
    }
}
