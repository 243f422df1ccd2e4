//! In-process plugin registry.
//!
//! Built once during boot, before the server accepts connections, and
//! read-only afterwards apart from the per-plugin lifecycle state, which the
//! admin toggle updates while the server is live.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use super::record::{self, NewPluginRecord};
use super::{Plugin, PluginError};

/// Lifecycle state of a registered plugin within this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PluginState {
    /// Registered, not yet evaluated at boot.
    Registered,
    /// Enabled at boot and `setup` succeeded.
    Active,
    /// Disabled at boot; `setup` never ran.
    Dormant,
    /// Enabled at boot but `setup` returned an error.
    Failed,
    /// The enabled flag changed since boot; takes effect after a restart.
    Toggled,
}

impl PluginState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Active => "active",
            Self::Dormant => "dormant",
            Self::Failed => "failed",
            Self::Toggled => "toggled",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    boot: PluginState,
    toggled: bool,
    torn_down: bool,
}

impl Lifecycle {
    fn state(self) -> PluginState {
        if self.toggled {
            PluginState::Toggled
        } else {
            self.boot
        }
    }
}

/// Registered plugins in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    lifecycle: RwLock<HashMap<String, Lifecycle>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, creating its record on first sight.
    ///
    /// Returns `Ok(false)` without touching the database if a plugin with the
    /// same name is already registered. On error the plugin is not registered, so it can never be
    /// set up half-initialized.
    pub async fn register(
        &mut self,
        plugin: Arc<dyn Plugin>,
        pool: &SqlitePool,
    ) -> Result<bool, PluginError> {
        let name = plugin.name().to_string();
        if self.get_by_name(&name).is_some() {
            return Ok(false);
        }

        ensure_record(plugin.as_ref(), pool).await?;

        info!(
            plugin = %name,
            author = %plugin.author(),
            version = %plugin.version(),
            "plugin registered"
        );

        self.lifecycle.write().insert(
            name,
            Lifecycle {
                boot: PluginState::Registered,
                toggled: false,
                torn_down: false,
            },
        );
        self.plugins.push(plugin);

        Ok(true)
    }

    /// All registered plugins, in registration order.
    pub fn get_all(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Current lifecycle state, or `None` for an unknown name.
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.lifecycle.read().get(name).map(|l| l.state())
    }

    /// Record the boot outcome; clears any toggle made before evaluation.
    pub(crate) fn set_boot_state(&self, name: &str, state: PluginState) {
        if let Some(entry) = self.lifecycle.write().get_mut(name) {
            entry.boot = state;
            entry.toggled = false;
        }
    }

    /// Note that the enabled flag flipped. A second flip cancels the first.
    pub(crate) fn mark_toggled(&self, name: &str) {
        if let Some(entry) = self.lifecycle.write().get_mut(name) {
            entry.toggled = !entry.toggled;
        }
    }

    /// Plugins whose `setup` succeeded and that have not been torn down yet.
    /// Each one is returned only once.
    pub(crate) fn take_running(&self) -> Vec<Arc<dyn Plugin>> {
        let mut lifecycle = self.lifecycle.write();
        self.plugins
            .iter()
            .filter(|p| {
                lifecycle.get_mut(p.name()).is_some_and(|entry| {
                    let running = entry.boot == PluginState::Active && !entry.torn_down;
                    if running {
                        entry.torn_down = true;
                    }
                    running
                })
            })
            .cloned()
            .collect()
    }
}

/// Make sure a live record exists for `plugin`.
async fn ensure_record(plugin: &dyn Plugin, pool: &SqlitePool) -> Result<(), PluginError> {
    let name = plugin.name();

    let existing = record::find_by_name(pool, name)
        .await
        .map_err(|e| PluginError::persistence(name, e))?;
    if existing.is_some() {
        return Ok(());
    }

    let settings = serde_json::to_string(&plugin.default_settings()).map_err(|e| {
        PluginError::SettingsSerialization {
            plugin: name.to_string(),
            details: e.to_string(),
        }
    })?;

    // No live record yet, so this reads as disabled.
    let enabled = plugin.enabled(pool).await;

    let inserted = record::register(
        pool,
        &NewPluginRecord {
            name,
            author: plugin.author(),
            version: plugin.version(),
            enabled,
            settings,
        },
    )
    .await
    .map_err(|e| PluginError::persistence(name, e))?;

    if inserted {
        info!(plugin = %name, "plugin record created");
    }

    Ok(())
}
