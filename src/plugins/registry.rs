//! Plugin registry for Plugkit
//!
//! This module provides the `PluginRegistry` struct: the host-owned set of
//! loaded plugins, the directory scanners that fill it, and the activation
//! filter that narrows it to the plugins matching the project's application
//! type.
//!
//! Plugins are kept in insertion order, which for discovered plugins is the
//! order the filesystem lists their directories. Mutations mark the registry
//! dirty; the next [`read`](PluginRegistry::read) resolves the application
//! type and drops incompatible plugins, once per dirty mark.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{config_dir, ConfigProvider, FileConfig, PathMapper, ProjectPaths, DEFAULT_DEV_PORT};
use crate::error::{PluginError, Result};

use super::loader::{load_plugin, plugin_dirs, LoadOutcome, DEV_ENTRY, DEV_PUBLIC_DIR};
use super::types::{PluginDescriptor, PluginUi, COMMON_APP_TYPE};

/// Directory, relative to a project root, holding in-progress dev plugins.
pub const DEV_FEATURES_DIR: &str = "src/features";

/// URL of the live bundle a dev server serves for the plugin `name`.
pub fn dev_bundle_url(port: u16, name: &str) -> String {
    format!("http://localhost:{}/static/js/{}.bundle.js", port, name)
}

/// The set of loaded plugins for one host process.
///
/// The registry owns its collaborators: a [`ConfigProvider`] that supplies the
/// declared application type (and receives the resolved one), and a
/// [`PathMapper`] used to check plugins' feature files against the project.
///
/// # Example
///
/// ```rust
/// use plugkit::plugins::{PluginDescriptor, PluginRegistry};
///
/// let mut registry = PluginRegistry::for_project("/tmp/my-app");
/// let routes = PluginDescriptor::new("routes").with_app_type("web").app_plugin();
/// registry.add(Some(routes)).unwrap();
/// registry.add(Some(PluginDescriptor::new("lint"))).unwrap();
///
/// let names: Vec<&str> = registry.read(None).iter().map(|p| p.name.as_str()).collect();
/// assert_eq!(names, vec!["routes", "lint"]);
/// assert_eq!(registry.app_type(), Some("web"));
/// ```
pub struct PluginRegistry {
    /// Loaded plugins in insertion order.
    plugins: Vec<PluginDescriptor>,

    /// Set by every add; cleared by the activation filter.
    needs_filter: bool,

    /// Plugin root directories, default root first.
    roots: Vec<PathBuf>,

    config: Box<dyn ConfigProvider>,
    paths: Box<dyn PathMapper>,
}

impl PluginRegistry {
    /// Create an empty registry over explicit collaborators.
    pub fn new(config: Box<dyn ConfigProvider>, paths: Box<dyn PathMapper>) -> Self {
        Self {
            plugins: Vec::new(),
            needs_filter: true,
            roots: vec![Self::default_root()],
            config,
            paths,
        }
    }

    /// Create an empty registry for the project at `root`, reading
    /// `<root>/plugkit.json` and resolving feature files against `root`.
    pub fn for_project(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self::new(
            Box::new(FileConfig::new(root.clone())),
            Box::new(ProjectPaths::new(root)),
        )
    }

    /// The default plugin root, `~/.plugkit/plugins`.
    pub fn default_root() -> PathBuf {
        config_dir().join("plugins")
    }

    /// Register an additional plugin root, scanned after the existing ones.
    pub fn add_root(&mut self, dir: impl Into<PathBuf>) {
        self.roots.push(dir.into());
    }

    /// Plugin roots in scan order; the default root is always first.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Add a plugin.
    ///
    /// Returns `Ok(true)` if the plugin was inserted. `None` and plugins whose
    /// name is already registered are ignored with a warning (`Ok(false)`);
    /// the existing plugin is never replaced.
    ///
    /// # Errors
    /// `PluginError::MissingName` if the plugin has no name. The registry is
    /// left untouched.
    pub fn add(&mut self, plugin: Option<PluginDescriptor>) -> Result<bool> {
        let Some(plugin) = plugin else {
            warn!("Adding an empty plugin, ignored");
            return Ok(false);
        };

        if !plugin.has_name() {
            return Err(PluginError::MissingName);
        }

        info!(plugin = %plugin.name, "Adding plugin");
        if !self.needs_filter {
            warn!(
                plugin = %plugin.name,
                "Adding a plugin after the registry was read; earlier reads are stale"
            );
        }
        self.needs_filter = true;

        if self.plugins.iter().any(|p| p.name == plugin.name) {
            warn!(plugin = %plugin.name, "A plugin with the same name is already registered, ignored");
            return Ok(false);
        }

        self.plugins.push(plugin);
        Ok(true)
    }

    /// Load the plugin at `dir` and add it.
    ///
    /// Load failures are logged with the plugin path and dropped; so are
    /// plugins whose feature files do not match the project. Returns whether a
    /// plugin was inserted.
    pub fn add_from_path(&mut self, dir: &Path) -> Result<bool> {
        match load_plugin(dir, false, self.paths.as_ref()) {
            Ok(LoadOutcome::Loaded(plugin)) => self.add(Some(plugin)),
            Ok(LoadOutcome::NotApplicable { name, .. }) => {
                debug!(plugin = %name, dir = %dir.display(), "Plugin not applicable, skipped");
                Ok(false)
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to load plugin, skipping");
                Ok(false)
            }
        }
    }

    /// Remove every plugin named `name`. Returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.plugins.len();
        self.plugins.retain(|p| p.name != name);
        let removed = before - self.plugins.len();

        if removed == 0 {
            warn!(plugin = %name, "No plugin was removed");
        } else {
            info!(plugin = %name, "Removed plugin");
        }
        removed
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// Load every plugin directory directly under `dir`.
    ///
    /// Additive: previously loaded plugins stay. An unreadable `dir` is logged
    /// and skipped. Returns the number of plugins added.
    pub fn discover(&mut self, dir: &Path) -> usize {
        info!(dir = %dir.display(), "Discovering plugins");

        let dirs = match plugin_dirs(dir) {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot scan plugin directory");
                return 0;
            }
        };

        let mut added = 0;
        for plugin_dir in dirs {
            match self.add_from_path(&plugin_dir) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(dir = %plugin_dir.display(), error = %e, "Failed to add plugin, skipping");
                }
            }
        }
        added
    }

    /// Run [`discover`](Self::discover) over every registered root in order.
    ///
    /// Roots that do not exist are skipped.
    pub fn discover_roots(&mut self) -> usize {
        let roots = self.roots.clone();
        let mut added = 0;
        for root in roots {
            if !root.is_dir() {
                info!(dir = %root.display(), "Plugin root does not exist, skipping");
                continue;
            }
            added += self.discover(&root);
        }
        added
    }

    /// Load in-progress plugins from another project's `src/features`.
    ///
    /// Each feature folder is loaded with its static UI suppressed. Folders
    /// with an `entry.js` get a UI served live by that project's dev server:
    /// rooted at the folder's `public` directory and linked to
    /// `http://localhost:<devPort>/static/js/<name>.bundle.js`. Plugins are
    /// added through [`add`](Self::add), so uniqueness rules apply. Returns the
    /// number of plugins added.
    pub fn load_dev(&mut self, project_root: &Path) -> usize {
        let dev_port = match self.config.app_config(Some(project_root)) {
            Ok(config) => config.dev_port,
            Err(e) => {
                warn!(
                    project = %project_root.display(),
                    error = %e,
                    "Cannot read dev project config, using default port"
                );
                DEFAULT_DEV_PORT
            }
        };

        let features_dir = project_root.join(DEV_FEATURES_DIR);
        let dirs = match plugin_dirs(&features_dir) {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!(dir = %features_dir.display(), error = %e, "No dev plugins to load");
                return 0;
            }
        };

        let mut added = 0;
        for dir in dirs {
            info!(dir = %dir.display(), "Loading dev plugin");
            let mut plugin = match load_plugin(&dir, true, self.paths.as_ref()) {
                Ok(LoadOutcome::Loaded(plugin)) => plugin,
                Ok(LoadOutcome::NotApplicable { name, .. }) => {
                    debug!(plugin = %name, "Dev plugin not applicable, skipped");
                    continue;
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Failed to load dev plugin, skipping");
                    continue;
                }
            };

            if dir.join(DEV_ENTRY).is_file() {
                plugin.ui = Some(PluginUi {
                    root: dir.join(DEV_PUBLIC_DIR),
                    root_link: Some(dev_bundle_url(dev_port, &plugin.name)),
                });
            }

            match self.add(Some(plugin)) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to add dev plugin"),
            }
        }
        added
    }

    // ========================================================================
    // Read path
    // ========================================================================

    /// Active plugins in insertion order.
    ///
    /// Runs the activation filter first if the registry changed since the
    /// last read. With `property`, only plugins for which that property is
    /// truthy are returned (see [`PluginDescriptor::has_property`]).
    pub fn read(&mut self, property: Option<&str>) -> Vec<&PluginDescriptor> {
        if self.needs_filter {
            self.apply_activation_filter();
        }

        self.plugins
            .iter()
            .filter(|p| property.map_or(true, |prop| p.has_property(prop)))
            .collect()
    }

    /// Resolve the application type and drop plugins that do not match it.
    ///
    /// The declared type wins; otherwise it is inferred from the app plugins,
    /// falling back to `common`. Inference starts from scratch on every pass.
    fn apply_activation_filter(&mut self) {
        let declared = match self.config.app_config(None) {
            Ok(config) => config.app_type,
            Err(e) => {
                warn!(error = %e, "Cannot read project config, inferring app type");
                None
            }
        };

        let app_type = declared
            .or_else(|| self.infer_app_type())
            .unwrap_or_else(|| COMMON_APP_TYPE.to_string());
        self.config.set_app_type(&app_type);

        let before = self.plugins.len();
        self.plugins.retain(|p| p.applies_to(&app_type));
        debug!(
            app_type = %app_type,
            dropped = before - self.plugins.len(),
            "Activation filter applied"
        );

        for plugin in &self.plugins {
            let ui_root = plugin
                .ui
                .as_ref()
                .map(|ui| ui.root.display().to_string())
                .unwrap_or_default();
            info!(plugin = %plugin.name, ui = %ui_root, "Plugin applied");
        }

        self.needs_filter = false;
    }

    /// The first app plugin not declared `common` decides. One without an
    /// app type resolves to `common`; a list contributes its first entry.
    fn infer_app_type(&self) -> Option<String> {
        let decider = self.plugins.iter().find(|p| {
            p.is_app_plugin && !p.app_type.as_ref().is_some_and(|t| t.is_common())
        })?;
        let app_type = decider
            .app_type
            .as_ref()
            .and_then(|t| t.primary())
            .unwrap_or(COMMON_APP_TYPE);
        debug!(plugin = %decider.name, app_type = %app_type, "Inferred app type");
        Some(app_type.to_string())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Application type resolved by the most recent read.
    pub fn app_type(&self) -> Option<&str> {
        self.config.resolved_app_type()
    }

    /// Look up a plugin by name without triggering the activation filter.
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|p| p.name == name)
    }

    /// Number of plugins currently held, filtered or not.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the registry holds no plugins.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Whether the next read will run the activation filter.
    pub fn is_dirty(&self) -> bool {
        self.needs_filter
    }

    /// The configuration provider.
    pub fn config(&self) -> &dyn ConfigProvider {
        self.config.as_ref()
    }
}
