//! Error types for Plugkit
//!
//! This module defines the error types used throughout the plugin host.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for Plugkit operations.
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration-related errors (unreadable config, bad values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A plugin manifest or implementation module is missing, malformed, or
    /// carries fields of the wrong type.
    #[error("Invalid plugin at {}: {}", .path.display(), .reason)]
    InvalidManifest {
        /// Plugin directory the manifest was read from.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// A descriptor without a name was handed to the registry.
    #[error("Each plugin should have a name")]
    MissingName,

    /// Resource not found (plugin directories, manifests, etc.)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Shorthand for an [`PluginError::InvalidManifest`] at `path`.
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for Plugkit operations.
pub type Result<T> = std::result::Result<T, PluginError>;
