//! Application state shared across all handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::plugin::PluginRegistry;
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// SQLite connection pool.
    db: SqlitePool,

    /// Theme engine, including templates added by plugins at boot.
    theme: ThemeEngine,

    /// Registered plugins. Frozen after boot except for lifecycle state.
    plugins: Arc<PluginRegistry>,
}

impl AppState {
    pub fn new(db: SqlitePool, theme: ThemeEngine, plugins: Arc<PluginRegistry>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { db, theme, plugins }),
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn theme(&self) -> &ThemeEngine {
        &self.inner.theme
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.inner.plugins
    }

    /// Shared handle to the registry, for shutdown after the router is gone.
    pub fn plugins_handle(&self) -> Arc<PluginRegistry> {
        Arc::clone(&self.inner.plugins)
    }
}
