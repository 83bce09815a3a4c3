//! Plugin system for Plugkit
//!
//! This module discovers plugin directories, loads each plugin's manifest and
//! optional implementation module, drops plugins that do not fit the current
//! project, and keeps the active set in a [`PluginRegistry`] narrowed to one
//! application type per run.
//!
//! # Architecture
//!
//! - **types**: Core data structures (`PluginDescriptor`, `PluginManifest`, `AppType`, `PluginUi`)
//! - **applicability**: Feature-file checks against the project layout
//! - **loader**: Plugin directory listing and loading
//! - **registry**: Registration, discovery, dev-mode loading and activation filtering
//!
//! # Plugin Directory Structure
//!
//! ```text
//! ~/.plugkit/plugins/
//! ├── web-routes/
//! │   ├── package.json
//! │   ├── main.js            # static UI entry (optional)
//! │   └── core/
//! │       └── index.json     # implementation exports (optional)
//! └── lint/
//!     └── package.json
//! ```
//!
//! # Example package.json
//!
//! ```json
//! {
//!   "name": "web-routes",
//!   "version": "1.0.0",
//!   "appType": "web",
//!   "isAppPlugin": true,
//!   "featureFiles": ["src/features", "!src/legacy"]
//! }
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use plugkit::plugins::PluginRegistry;
//!
//! let mut registry = PluginRegistry::for_project("/home/user/my-app");
//! registry.add_root("/opt/plugkit/plugins");
//! registry.discover_roots();
//! registry.load_dev(Path::new("/home/user/my-plugin-project"));
//!
//! for plugin in registry.read(Some("ui")) {
//!     println!("{} has a UI", plugin.name);
//! }
//! ```

pub mod applicability;
mod loader;
pub mod registry;
pub mod types;

pub use loader::{
    load_plugin, plugin_dirs, LoadOutcome, CORE_MODULE, DEV_ENTRY, DEV_PUBLIC_DIR, MANIFEST_FILE,
    UI_ENTRY,
};
pub use registry::{dev_bundle_url, PluginRegistry, DEV_FEATURES_DIR};
pub use types::{AppType, PluginDescriptor, PluginManifest, PluginUi, COMMON_APP_TYPE};
