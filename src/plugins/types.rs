//! Plugin types for Plugkit
//!
//! This module defines the types used by the plugin system: the manifest
//! fields read from a plugin's `package.json`, the application type a plugin
//! targets, the UI capability record, and the runtime plugin descriptor held
//! by the registry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Application type that matches only universal and `common` plugins.
pub const COMMON_APP_TYPE: &str = "common";

/// The application type(s) a plugin applies to.
///
/// Manifests may declare either a single type or a list of types:
///
/// ```json
/// { "appType": "web" }
/// { "appType": ["web", "electron"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppType {
    /// A single application type.
    Single(String),
    /// Any of several application types.
    Multiple(Vec<String>),
}

impl AppType {
    /// Whether `app_type` is one of the declared types (exact match).
    pub fn contains(&self, app_type: &str) -> bool {
        match self {
            AppType::Single(t) => t == app_type,
            AppType::Multiple(types) => types.iter().any(|t| t == app_type),
        }
    }

    /// The type used when this plugin determines the inferred application
    /// type: the single value, or the first entry of a list.
    pub fn primary(&self) -> Option<&str> {
        match self {
            AppType::Single(t) => Some(t.as_str()),
            AppType::Multiple(types) => types.first().map(String::as_str),
        }
    }

    /// Exactly the single value `common`. A list is never common, even one
    /// that contains it.
    pub fn is_common(&self) -> bool {
        matches!(self, AppType::Single(t) if t == COMMON_APP_TYPE)
    }
}

impl From<&str> for AppType {
    fn from(value: &str) -> Self {
        AppType::Single(value.to_string())
    }
}

impl From<Vec<&str>> for AppType {
    fn from(values: Vec<&str>) -> Self {
        AppType::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

/// UI capability contributed by a plugin.
///
/// The host never loads UI code; it only forwards where the bundle lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginUi {
    /// Static UI bundle location (the plugin directory, or its `public`
    /// folder for dev plugins).
    pub root: PathBuf,

    /// Live bundle URL served by a dev server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_link: Option<String>,
}

impl PluginUi {
    /// A static UI bundle rooted at `root`.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            root_link: None,
        }
    }
}

/// The fields Plugkit reads from a plugin's `package.json`.
///
/// Every other key of the manifest (version, dependencies, ...) is ignored.
///
/// # Example
///
/// ```json
/// {
///   "name": "web-routes",
///   "version": "1.0.0",
///   "appType": "web",
///   "isAppPlugin": true,
///   "featureFiles": ["src/features", "!src/legacy"]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Plugin name, unique across the registry.
    #[serde(default)]
    pub name: Option<String>,

    /// Application type(s) the plugin targets. Absent means universal.
    #[serde(default)]
    pub app_type: Option<AppType>,

    /// Whether the plugin may determine the inferred application type.
    #[serde(default)]
    pub is_app_plugin: Option<bool>,

    /// Feature-file patterns. Kept raw: anything but a list disables the
    /// applicability check.
    #[serde(default)]
    pub feature_files: Option<Value>,
}

/// A loaded plugin as held by the registry.
///
/// Known fields are typed; whatever else the plugin's implementation module
/// exports is carried in [`extensions`](PluginDescriptor::extensions) and
/// passed through to callers uninterpreted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// Unique plugin name. Empty means the plugin has no name.
    pub name: String,

    /// Application type(s). `None` makes the plugin universal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_type: Option<AppType>,

    /// Eligible to determine the inferred application type.
    pub is_app_plugin: bool,

    /// UI capability, if the plugin contributes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<PluginUi>,

    /// Directory the plugin was loaded from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Opaque values exported by the implementation module.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

impl PluginDescriptor {
    /// Create a universal, non-app plugin with no UI.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app_type: None,
            is_app_plugin: false,
            ui: None,
            path: None,
            extensions: Map::new(),
        }
    }

    /// Set the application type.
    pub fn with_app_type(mut self, app_type: impl Into<AppType>) -> Self {
        self.app_type = Some(app_type.into());
        self
    }

    /// Mark the plugin as an app plugin.
    pub fn app_plugin(mut self) -> Self {
        self.is_app_plugin = true;
        self
    }

    /// Attach a UI capability.
    pub fn with_ui(mut self, ui: PluginUi) -> Self {
        self.ui = Some(ui);
        self
    }

    /// Add an extension value.
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Whether the plugin has a name.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Whether the plugin applies to `app_type`: universal plugins always do,
    /// others only when the type is one of theirs.
    pub fn applies_to(&self, app_type: &str) -> bool {
        self.app_type.as_ref().map_or(true, |t| t.contains(app_type))
    }

    /// Evaluate a property as a boolean.
    ///
    /// `name`, `appType`, `isAppPlugin`, `ui` and `path` address the known
    /// fields; any other property is looked up in the extensions, where
    /// `null`, `false`, `0` and `""` count as false.
    pub fn has_property(&self, property: &str) -> bool {
        match property {
            "name" => self.has_name(),
            "appType" => self.app_type.is_some(),
            "isAppPlugin" => self.is_app_plugin,
            "ui" => self.ui.is_some(),
            "path" => self.path.is_some(),
            other => self.extensions.get(other).is_some_and(is_truthy),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
