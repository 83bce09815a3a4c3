//! Plugin discovery and loading for Plugkit
//!
//! This module lists candidate plugin directories, reads each plugin's
//! `package.json` manifest and optional `core/index.json` implementation
//! module, attaches the static UI capability, and runs the applicability
//! check against the current project.
//!
//! Loading never panics on bad input: every problem with a plugin directory
//! comes back as a [`PluginError`] so the registry can log it and move on to
//! the next plugin.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::PathMapper;
use crate::error::{PluginError, Result};

use super::applicability::{feature_patterns, is_applicable};
use super::types::{AppType, PluginDescriptor, PluginManifest, PluginUi};

/// Manifest file every plugin directory must contain.
pub const MANIFEST_FILE: &str = "package.json";

/// Optional implementation module whose exports are merged onto the plugin.
pub const CORE_MODULE: &str = "core/index.json";

/// Static UI entry; its presence gives the plugin a UI capability.
pub const UI_ENTRY: &str = "main.js";

/// Dev UI entry, looked for by the dev-mode scanner.
pub const DEV_ENTRY: &str = "entry.js";

/// Build output folder served for dev plugins.
pub const DEV_PUBLIC_DIR: &str = "public";

/// What loading a plugin directory produced.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The plugin loaded and applies to the current project.
    Loaded(PluginDescriptor),

    /// The plugin loaded but its feature files do not match the project.
    NotApplicable {
        /// Plugin name from the manifest.
        name: String,
        /// Plugin directory.
        path: PathBuf,
    },
}

impl LoadOutcome {
    /// The descriptor, if the plugin applies.
    pub fn into_descriptor(self) -> Option<PluginDescriptor> {
        match self {
            LoadOutcome::Loaded(plugin) => Some(plugin),
            LoadOutcome::NotApplicable { .. } => None,
        }
    }
}

/// List the immediate subdirectories of `dir`, in the order the filesystem
/// reports them.
///
/// Regular files are skipped. Entries that cannot be read are logged and
/// skipped; only failing to read `dir` itself is an error.
pub fn plugin_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        PluginError::Config(format!(
            "Failed to read plugin directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to read directory entry, skipping");
                continue;
            }
        };

        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }

    Ok(dirs)
}

/// Load a single plugin from its directory.
///
/// Implementation-module exports are merged first; the manifest's `name`,
/// `appType`, `isAppPlugin` and `featureFiles` then override same-named
/// exports. Unless `suppress_ui` is set, a `main.js` entry gives the plugin a
/// UI capability rooted at `dir`.
///
/// # Errors
/// - `PluginError::NotFound` if `package.json` does not exist
/// - `PluginError::InvalidManifest` if the manifest or implementation module
///   is unreadable, malformed, or leaves the plugin without a name
pub fn load_plugin(dir: &Path, suppress_ui: bool, paths: &dyn PathMapper) -> Result<LoadOutcome> {
    info!(dir = %dir.display(), "Loading plugin");

    let manifest = read_manifest(dir)?;
    let core = match read_core_module(dir)? {
        Some(exports) => CoreExports::split(exports, dir)?,
        None => CoreExports::default(),
    };

    let mut ui = core.ui;
    if !suppress_ui && dir.join(UI_ENTRY).is_file() {
        ui = Some(PluginUi::at(dir));
    }

    let name = manifest
        .name
        .or(core.name)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| PluginError::invalid(dir, "plugin has no name"))?;

    let raw_feature_files = manifest.feature_files.or(core.feature_files);
    let patterns = feature_patterns(raw_feature_files.as_ref(), dir)?;
    if !is_applicable(patterns.as_deref(), paths) {
        debug!(plugin = %name, dir = %dir.display(), "Plugin does not apply to this project");
        return Ok(LoadOutcome::NotApplicable {
            name,
            path: dir.to_path_buf(),
        });
    }

    Ok(LoadOutcome::Loaded(PluginDescriptor {
        name,
        app_type: manifest.app_type.or(core.app_type),
        is_app_plugin: manifest.is_app_plugin.or(core.is_app_plugin).unwrap_or(false),
        ui,
        path: Some(dir.to_path_buf()),
        extensions: core.extensions,
    }))
}

fn read_manifest(dir: &Path) -> Result<PluginManifest> {
    let manifest_path = dir.join(MANIFEST_FILE);

    if !manifest_path.exists() {
        return Err(PluginError::NotFound(format!(
            "No {} found in {}",
            MANIFEST_FILE,
            dir.display()
        )));
    }

    let content = fs::read_to_string(&manifest_path)
        .map_err(|e| PluginError::invalid(dir, format!("failed to read {}: {}", MANIFEST_FILE, e)))?;

    serde_json::from_str(&content)
        .map_err(|e| PluginError::invalid(dir, format!("malformed {}: {}", MANIFEST_FILE, e)))
}

fn read_core_module(dir: &Path) -> Result<Option<Map<String, Value>>> {
    let core_path = dir.join(CORE_MODULE);
    if !core_path.is_file() {
        return Ok(None);
    }

    let content = fs::read_to_string(&core_path)
        .map_err(|e| PluginError::invalid(dir, format!("failed to read {}: {}", CORE_MODULE, e)))?;

    match serde_json::from_str(&content) {
        Ok(Value::Object(exports)) => Ok(Some(exports)),
        Ok(_) => Err(PluginError::invalid(
            dir,
            format!("{} must export an object", CORE_MODULE),
        )),
        Err(e) => Err(PluginError::invalid(
            dir,
            format!("malformed {}: {}", CORE_MODULE, e),
        )),
    }
}

/// Implementation-module exports, split into the keys the host understands
/// and everything else.
#[derive(Debug, Default)]
struct CoreExports {
    name: Option<String>,
    app_type: Option<AppType>,
    is_app_plugin: Option<bool>,
    feature_files: Option<Value>,
    ui: Option<PluginUi>,
    extensions: Map<String, Value>,
}

impl CoreExports {
    fn split(mut exports: Map<String, Value>, dir: &Path) -> Result<Self> {
        Ok(Self {
            name: take(&mut exports, "name", dir)?,
            app_type: take(&mut exports, "appType", dir)?,
            is_app_plugin: take(&mut exports, "isAppPlugin", dir)?,
            feature_files: exports.remove("featureFiles"),
            ui: take(&mut exports, "ui", dir)?,
            extensions: exports,
        })
    }
}

fn take<T: DeserializeOwned>(
    exports: &mut Map<String, Value>,
    key: &str,
    dir: &Path,
) -> Result<Option<T>> {
    match exports.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
            PluginError::invalid(dir, format!("invalid '{}' in {}: {}", key, CORE_MODULE, e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectPaths;
    use serde_json::json;
    use tempfile::TempDir;

    /// A project root plus a directory to hold plugins.
    struct Fixture {
        project: TempDir,
        plugins: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let project = TempDir::new().unwrap();
            fs::create_dir_all(project.path().join("src/features")).unwrap();
            Self {
                project,
                plugins: TempDir::new().unwrap(),
            }
        }

        fn paths(&self) -> ProjectPaths {
            ProjectPaths::new(self.project.path())
        }

        fn plugin(&self, dir_name: &str, manifest: Value) -> PathBuf {
            let dir = self.plugins.path().join(dir_name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join(MANIFEST_FILE),
                serde_json::to_string_pretty(&manifest).unwrap(),
            )
            .unwrap();
            dir
        }

        fn load(&self, dir: &Path, suppress_ui: bool) -> Result<LoadOutcome> {
            load_plugin(dir, suppress_ui, &self.paths())
        }
    }

    fn write_core(dir: &Path, exports: &str) {
        fs::create_dir_all(dir.join("core")).unwrap();
        fs::write(dir.join(CORE_MODULE), exports).unwrap();
    }

    fn loaded(outcome: LoadOutcome) -> PluginDescriptor {
        outcome
            .into_descriptor()
            .expect("plugin should have loaded")
    }

    // ---- plugin_dirs tests ----

    #[test]
    fn test_plugin_dirs_lists_only_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("alpha")).unwrap();
        fs::create_dir(tmp.path().join("beta")).unwrap();
        fs::write(tmp.path().join("README.md"), "notes").unwrap();

        let mut dirs = plugin_dirs(tmp.path()).unwrap();
        dirs.sort();
        assert_eq!(
            dirs,
            vec![tmp.path().join("alpha"), tmp.path().join("beta")]
        );
    }

    #[test]
    fn test_plugin_dirs_empty_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(plugin_dirs(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_plugin_dirs_nonexistent_directory() {
        let result = plugin_dirs(Path::new("/nonexistent/path/plugins"));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read plugin directory"));
    }

    // ---- load_plugin tests ----

    #[test]
    fn test_load_plugin_manifest_only() {
        let fx = Fixture::new();
        let dir = fx.plugin(
            "routes",
            json!({ "name": "routes", "version": "1.0.0", "appType": "web", "isAppPlugin": true }),
        );

        let plugin = loaded(fx.load(&dir, false).unwrap());
        assert_eq!(plugin.name, "routes");
        assert_eq!(plugin.app_type, Some(AppType::from("web")));
        assert!(plugin.is_app_plugin);
        assert!(plugin.ui.is_none());
        assert_eq!(plugin.path, Some(dir));
        assert!(plugin.extensions.is_empty());
    }

    #[test]
    fn test_load_plugin_missing_manifest() {
        let fx = Fixture::new();
        let dir = fx.plugins.path().join("empty");
        fs::create_dir(&dir).unwrap();

        let err = fx.load(&dir, false).unwrap_err();
        assert!(matches!(err, PluginError::NotFound(_)));
        assert!(err.to_string().contains("No package.json found"));
    }

    #[test]
    fn test_load_plugin_malformed_manifest() {
        let fx = Fixture::new();
        let dir = fx.plugins.path().join("broken");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), "{ not valid json }").unwrap();

        let err = fx.load(&dir, false).unwrap_err();
        assert!(matches!(err, PluginError::InvalidManifest { .. }));
        assert!(err.to_string().contains("malformed package.json"));
    }

    #[test]
    fn test_load_plugin_manifest_not_an_object() {
        let fx = Fixture::new();
        let dir = fx.plugin("scalar", json!("just a string"));
        assert!(fx.load(&dir, false).is_err());
    }

    #[test]
    fn test_load_plugin_rejects_mistyped_manifest_fields() {
        let fx = Fixture::new();
        let flag = fx.plugin("flag", json!({ "name": "flag", "isAppPlugin": "yes" }));
        let numeric = fx.plugin("numeric", json!({ "name": "numeric", "appType": 3 }));

        for dir in [flag, numeric] {
            let err = fx.load(&dir, false).unwrap_err();
            assert!(matches!(err, PluginError::InvalidManifest { .. }));
            assert!(err.to_string().contains("malformed package.json"));
        }
    }

    #[test]
    fn test_load_plugin_without_name() {
        let fx = Fixture::new();
        let dir = fx.plugin("anon", json!({ "version": "1.0.0" }));

        let err = fx.load(&dir, false).unwrap_err();
        assert!(err.to_string().contains("plugin has no name"));
    }

    #[test]
    fn test_load_plugin_attaches_static_ui() {
        let fx = Fixture::new();
        let dir = fx.plugin("with-ui", json!({ "name": "with-ui" }));
        fs::write(dir.join(UI_ENTRY), "export default {}").unwrap();

        let plugin = loaded(fx.load(&dir, false).unwrap());
        assert_eq!(plugin.ui, Some(PluginUi::at(&dir)));
    }

    #[test]
    fn test_load_plugin_suppressed_ui() {
        let fx = Fixture::new();
        let dir = fx.plugin("with-ui", json!({ "name": "with-ui" }));
        fs::write(dir.join(UI_ENTRY), "export default {}").unwrap();

        let plugin = loaded(fx.load(&dir, true).unwrap());
        assert!(plugin.ui.is_none());
    }

    #[test]
    fn test_load_plugin_merges_core_exports() {
        let fx = Fixture::new();
        let dir = fx.plugin("cli", json!({ "name": "cli-tools" }));
        write_core(
            &dir,
            r#"{
                "appType": "cli",
                "isAppPlugin": true,
                "commands": ["add", "remove"],
                "hooks": { "afterAdd": "notify" }
            }"#,
        );

        let plugin = loaded(fx.load(&dir, false).unwrap());
        assert_eq!(plugin.name, "cli-tools");
        assert_eq!(plugin.app_type, Some(AppType::from("cli")));
        assert!(plugin.is_app_plugin);
        assert_eq!(plugin.extensions.len(), 2);
        assert_eq!(plugin.extensions["commands"], json!(["add", "remove"]));
        assert_eq!(plugin.extensions["hooks"]["afterAdd"], "notify");
    }

    #[test]
    fn test_manifest_fields_override_core_exports() {
        let fx = Fixture::new();
        let dir = fx.plugin(
            "override",
            json!({ "name": "from-manifest", "appType": ["web", "electron"], "isAppPlugin": false }),
        );
        write_core(
            &dir,
            r#"{ "name": "from-core", "appType": "cli", "isAppPlugin": true }"#,
        );

        let plugin = loaded(fx.load(&dir, false).unwrap());
        assert_eq!(plugin.name, "from-manifest");
        assert_eq!(plugin.app_type, Some(AppType::from(vec!["web", "electron"])));
        assert!(!plugin.is_app_plugin);
        assert!(plugin.extensions.is_empty());
    }

    #[test]
    fn test_core_name_used_when_manifest_has_none() {
        let fx = Fixture::new();
        let dir = fx.plugin("unnamed", json!({ "version": "0.1.0" }));
        write_core(&dir, r#"{ "name": "core-named" }"#);

        let plugin = loaded(fx.load(&dir, false).unwrap());
        assert_eq!(plugin.name, "core-named");
    }

    #[test]
    fn test_static_ui_overrides_core_ui() {
        let fx = Fixture::new();
        let dir = fx.plugin("ui", json!({ "name": "ui" }));
        write_core(&dir, r#"{ "ui": { "root": "/elsewhere" } }"#);

        let from_core = loaded(fx.load(&dir, false).unwrap());
        assert_eq!(from_core.ui, Some(PluginUi::at("/elsewhere")));

        fs::write(dir.join(UI_ENTRY), "").unwrap();
        let from_entry = loaded(fx.load(&dir, false).unwrap());
        assert_eq!(from_entry.ui, Some(PluginUi::at(&dir)));
    }

    #[test]
    fn test_core_module_must_be_object() {
        let fx = Fixture::new();
        let dir = fx.plugin("bad-core", json!({ "name": "bad-core" }));
        write_core(&dir, "[1, 2, 3]");

        let err = fx.load(&dir, false).unwrap_err();
        assert!(err.to_string().contains("must export an object"));
    }

    #[test]
    fn test_core_module_malformed() {
        let fx = Fixture::new();
        let dir = fx.plugin("bad-core", json!({ "name": "bad-core" }));
        write_core(&dir, "{ oops");

        let err = fx.load(&dir, false).unwrap_err();
        assert!(err.to_string().contains("malformed core/index.json"));
    }

    #[test]
    fn test_core_module_wrong_known_field_type() {
        let fx = Fixture::new();
        let dir = fx.plugin("bad-core", json!({ "name": "bad-core" }));
        write_core(&dir, r#"{ "isAppPlugin": "sometimes" }"#);

        let err = fx.load(&dir, false).unwrap_err();
        assert!(err.to_string().contains("invalid 'isAppPlugin'"));
    }

    #[test]
    fn test_load_plugin_applicable_feature_files() {
        let fx = Fixture::new();
        let dir = fx.plugin(
            "features",
            json!({ "name": "features", "featureFiles": ["src/features", "!src/legacy"] }),
        );

        let outcome = fx.load(&dir, false).unwrap();
        assert!(matches!(outcome, LoadOutcome::Loaded(_)));
    }

    #[test]
    fn test_load_plugin_not_applicable() {
        let fx = Fixture::new();
        let dir = fx.plugin(
            "routes",
            json!({ "name": "routes", "featureFiles": ["src/routes"] }),
        );

        let outcome = fx.load(&dir, false).unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::NotApplicable {
                name: "routes".to_string(),
                path: dir,
            }
        );
    }

    #[test]
    fn test_load_plugin_negated_feature_present() {
        let fx = Fixture::new();
        let dir = fx.plugin(
            "legacy",
            json!({ "name": "legacy", "featureFiles": ["!src/features"] }),
        );

        let outcome = fx.load(&dir, false).unwrap();
        assert!(outcome.into_descriptor().is_none());
    }

    #[test]
    fn test_feature_files_from_core_when_manifest_silent() {
        let fx = Fixture::new();
        let dir = fx.plugin("core-ff", json!({ "name": "core-ff" }));
        write_core(&dir, r#"{ "featureFiles": ["src/missing"] }"#);

        let outcome = fx.load(&dir, false).unwrap();
        assert!(matches!(outcome, LoadOutcome::NotApplicable { .. }));
    }

    #[test]
    fn test_feature_files_not_a_list_always_applies() {
        let fx = Fixture::new();
        let dir = fx.plugin(
            "loose",
            json!({ "name": "loose", "featureFiles": "src/missing" }),
        );

        assert!(matches!(
            fx.load(&dir, false).unwrap(),
            LoadOutcome::Loaded(_)
        ));
    }

    #[test]
    fn test_feature_files_with_non_string_entry() {
        let fx = Fixture::new();
        let dir = fx.plugin(
            "bad-ff",
            json!({ "name": "bad-ff", "featureFiles": ["src", 1] }),
        );

        assert!(fx.load(&dir, false).is_err());
    }
}
