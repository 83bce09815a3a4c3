//! Configuration for Plugkit
//!
//! Two layers of configuration feed the plugin host:
//!
//! - **Project configuration** (`<project>/plugkit.json`): the declared
//!   application type and the dev server port. Read through the
//!   [`ConfigProvider`] trait so the activation filter can both read the
//!   declared type and publish the type it resolved.
//! - **Host configuration** (`~/.plugkit/config.json`): extra plugin root
//!   directories scanned in addition to the default root.
//!
//! # Example plugkit.json
//!
//! ```json
//! {
//!   "appType": "web",
//!   "devPort": 6076
//! }
//! ```
//!
//! Environment variables `PLUGKIT_APP_TYPE` and `PLUGKIT_DEV_PORT` override
//! the file.

pub mod paths;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PluginError, Result};

pub use paths::{PathMapper, ProjectPaths};

/// Project configuration file name, looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = "plugkit.json";

/// Default port of the dev server that serves live plugin bundles.
pub const DEFAULT_DEV_PORT: u16 = 6076;

const APP_TYPE_ENV: &str = "PLUGKIT_APP_TYPE";
const DEV_PORT_ENV: &str = "PLUGKIT_DEV_PORT";

/// Lookup used for `PLUGKIT_*` overrides.
pub type EnvLookup = fn(&str) -> Option<String>;

/// Reads overrides from the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Directory holding host-wide state (`~/.plugkit`).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".plugkit")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

// ============================================================================
// Project configuration
// ============================================================================

/// Per-project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Explicitly declared application type. `None` lets the activation
    /// filter infer one from the loaded plugins.
    pub app_type: Option<String>,

    /// Port of the dev server used by dev-mode plugins.
    pub dev_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_type: None,
            dev_port: DEFAULT_DEV_PORT,
        }
    }
}

impl AppConfig {
    /// Load the configuration of the project at `root`, applying
    /// environment overrides.
    ///
    /// A missing `plugkit.json` yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_with(root, process_env)
    }

    /// Like [`load`](Self::load), with overrides taken from `lookup`.
    pub fn load_with<F>(root: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::from_file(&root.join(PROJECT_CONFIG_FILE))?;
        config.apply_overrides(lookup);
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No project config, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            PluginError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply `PLUGKIT_*` overrides looked up through `lookup`.
    ///
    /// A port override that is not a number is logged and ignored; the
    /// declared application type never depends on it.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(app_type) = lookup(APP_TYPE_ENV) {
            let app_type = app_type.trim();
            if !app_type.is_empty() {
                self.app_type = Some(app_type.to_string());
            }
        }

        if let Some(port) = lookup(DEV_PORT_ENV) {
            match port.trim().parse() {
                Ok(port) => self.dev_port = port,
                Err(_) => warn!(
                    value = %port,
                    dev_port = self.dev_port,
                    "{} must be a port number, keeping configured port",
                    DEV_PORT_ENV
                ),
            }
        }
    }
}

/// Source of project configuration for the plugin registry.
///
/// The activation filter reads the declared application type through
/// [`app_config`](ConfigProvider::app_config) and publishes the type it
/// resolved through [`set_app_type`](ConfigProvider::set_app_type), so other
/// readers of the configuration observe the inferred type as well.
pub trait ConfigProvider {
    /// Configuration of the host's project, or of `project_root` when given.
    fn app_config(&self, project_root: Option<&Path>) -> Result<AppConfig>;

    /// Record the application type resolved by the last activation pass.
    fn set_app_type(&mut self, app_type: &str);

    /// Application type recorded by [`set_app_type`](ConfigProvider::set_app_type).
    fn resolved_app_type(&self) -> Option<&str>;
}

/// File-backed [`ConfigProvider`] for a single project root.
#[derive(Clone)]
pub struct FileConfig {
    root: PathBuf,
    resolved: Option<String>,
    env: EnvLookup,
}

impl FileConfig {
    /// Create a provider reading `<root>/plugkit.json` and the process
    /// environment.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            resolved: None,
            env: process_env,
        }
    }

    /// Replace the source of `PLUGKIT_*` overrides.
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Project root this provider reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl std::fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfig")
            .field("root", &self.root)
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}

impl ConfigProvider for FileConfig {
    fn app_config(&self, project_root: Option<&Path>) -> Result<AppConfig> {
        AppConfig::load_with(project_root.unwrap_or(self.root.as_path()), self.env)
    }

    fn set_app_type(&mut self, app_type: &str) {
        self.resolved = Some(app_type.to_string());
    }

    fn resolved_app_type(&self) -> Option<&str> {
        self.resolved.as_deref()
    }
}

// ============================================================================
// Host configuration
// ============================================================================

/// Host-wide plugin settings, stored in `~/.plugkit/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostConfig {
    /// Extra plugin root directories, scanned after the default root.
    /// A leading `~` is expanded to the home directory.
    pub plugin_dirs: Vec<String>,
}

impl HostConfig {
    /// Path of the host config file.
    pub fn path() -> PathBuf {
        config_dir().join("config.json")
    }

    /// Load the host config; a missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load host config from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            PluginError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Extra plugin roots with `~` expanded.
    pub fn plugin_roots(&self) -> Vec<PathBuf> {
        self.plugin_dirs.iter().map(|d| expand_home(d)).collect()
    }
}
