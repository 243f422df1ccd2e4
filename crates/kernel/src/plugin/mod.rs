//! Plugin system.
//!
//! Plugins are compiled into the binary and handed to the kernel at boot.
//! Each one is registered into a [`PluginRegistry`], which makes sure a
//! persisted [`record::PluginRecord`] exists for it. [`lifecycle`] then runs
//! `setup` for every plugin whose record is enabled, letting it add routes
//! and templates through a [`PluginHost`]. Enabling or disabling a plugin
//! only changes its record; the change takes effect on the next boot, except
//! that [`gate`] stops serving a disabled plugin's routes immediately.

pub mod cli;
pub mod error;
pub mod gate;
pub mod host;
pub mod lifecycle;
pub mod record;
pub mod registry;

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::SqlitePool;

pub use error::PluginError;
pub use host::PluginHost;
pub use registry::{PluginRegistry, PluginState};

/// Flat string-to-string plugin configuration, stored as a JSON object.
pub type PluginSettings = BTreeMap<String, String>;

/// Capabilities every plugin provides.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique name; the natural key of the plugin record.
    fn name(&self) -> &str;

    fn author(&self) -> &str;

    fn version(&self) -> &str;

    /// Settings written on first registration and merged into every read.
    fn default_settings(&self) -> PluginSettings;

    /// One-time boot hook: run migrations, add templates and routes.
    ///
    /// Called at most once per process, and only when the plugin record is
    /// enabled. Must not block.
    async fn setup(&self, host: &mut PluginHost<'_>) -> Result<(), PluginError>;

    /// Release resources at shutdown. Only called for plugins whose `setup`
    /// succeeded.
    async fn teardown(&self) -> Result<(), PluginError>;

    /// Current persisted enabled flag. A missing record reads as disabled.
    async fn enabled(&self, pool: &SqlitePool) -> bool {
        match record::is_enabled(pool, self.name()).await {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::error!(plugin = %self.name(), error = %e, "failed to read enabled flag");
                false
            }
        }
    }

    /// Current settings with defaults filled in. Falls back to the defaults
    /// when the record is missing or unreadable.
    async fn settings(&self, pool: &SqlitePool) -> PluginSettings {
        let defaults = self.default_settings();
        match record::load_settings(pool, self.name(), &defaults).await {
            Ok(Some(settings)) => settings,
            Ok(None) => defaults,
            Err(e) => {
                tracing::error!(plugin = %self.name(), error = %e, "failed to read settings");
                defaults
            }
        }
    }
}
