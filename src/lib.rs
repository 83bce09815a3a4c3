//! Plugkit - plugin discovery, loading and activation for project tooling

pub mod config;
pub mod error;
pub mod plugins;

pub use error::{PluginError, Result};
pub use plugins::{PluginDescriptor, PluginRegistry};
