//! Plugin system error types.
//!
//! Every variant carries the plugin name so a log line alone is enough to
//! tell which plugin misbehaved.

use std::fmt::Display;

use thiserror::Error;

/// Errors raised while registering, starting or stopping plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// `setup` returned an error; the plugin stays inactive for this process.
    #[error("plugin '{plugin}': setup failed: {details}")]
    SetupFailed { plugin: String, details: String },

    /// `teardown` returned an error during shutdown.
    #[error("plugin '{plugin}': teardown failed: {details}")]
    TeardownFailed { plugin: String, details: String },

    /// Default settings could not be encoded into the settings blob.
    #[error("plugin '{plugin}': failed to serialize settings: {details}")]
    SettingsSerialization { plugin: String, details: String },

    /// Reading or writing the plugin record failed.
    #[error("plugin '{plugin}': persistence error: {details}")]
    Persistence { plugin: String, details: String },

    /// A route path is invalid or already served by the kernel or another
    /// plugin.
    #[error("plugin '{plugin}': route {path} conflicts with an existing route")]
    RouteConflict { plugin: String, path: String },

    /// No plugin with this name is registered.
    #[error("plugin '{plugin}': not registered")]
    NotFound { plugin: String },
}

impl PluginError {
    /// Create a setup failure from any displayable cause.
    pub fn setup(plugin: impl Into<String>, cause: impl Display) -> Self {
        Self::SetupFailed {
            plugin: plugin.into(),
            details: cause.to_string(),
        }
    }

    /// Create a teardown failure from any displayable cause.
    pub fn teardown(plugin: impl Into<String>, cause: impl Display) -> Self {
        Self::TeardownFailed {
            plugin: plugin.into(),
            details: cause.to_string(),
        }
    }

    /// Create a persistence failure from any displayable cause.
    pub fn persistence(plugin: impl Into<String>, cause: impl Display) -> Self {
        Self::Persistence {
            plugin: plugin.into(),
            details: cause.to_string(),
        }
    }

    /// Name of the plugin this error concerns.
    pub fn plugin(&self) -> &str {
        match self {
            Self::SetupFailed { plugin, .. }
            | Self::TeardownFailed { plugin, .. }
            | Self::SettingsSerialization { plugin, .. }
            | Self::Persistence { plugin, .. }
            | Self::RouteConflict { plugin, .. }
            | Self::NotFound { plugin } => plugin,
        }
    }
}
