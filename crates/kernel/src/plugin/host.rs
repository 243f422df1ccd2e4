//! Host handle passed to a plugin's `setup`.

use axum::Router;
use axum::routing::MethodRouter;
use sqlx::SqlitePool;

use super::{PluginError, PluginSettings};
use crate::state::AppState;
use crate::theme::ThemeEngine;

/// What a plugin may touch while it sets itself up: the database, the
/// template engine and its own router. Routes added here are merged into the
/// application behind the plugin's enabled gate.
pub struct PluginHost<'a> {
    name: String,
    db: SqlitePool,
    theme: &'a mut ThemeEngine,
    settings: PluginSettings,
    router: Router<AppState>,
    paths: Vec<String>,
}

impl<'a> PluginHost<'a> {
    pub(crate) fn new(
        name: &str,
        db: SqlitePool,
        theme: &'a mut ThemeEngine,
        settings: PluginSettings,
    ) -> Self {
        Self {
            name: name.to_string(),
            db,
            theme,
            settings,
            router: Router::new(),
            paths: Vec::new(),
        }
    }

    /// Name of the plugin being set up.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Template engine, for registering plugin-owned templates.
    pub fn theme_mut(&mut self) -> &mut ThemeEngine {
        self.theme
    }

    /// Plugin settings as of boot, defaults merged in.
    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Add a route to the plugin's router.
    ///
    /// Each path may be added once; put every method for a path in one
    /// `MethodRouter`. A path that does not start with `/`, or that has the
    /// same shape as one already added, is rejected.
    pub fn route(
        &mut self,
        path: &str,
        method_router: MethodRouter<AppState>,
    ) -> Result<&mut Self, PluginError> {
        let shape = route_shape(path);
        if !path.starts_with('/') || self.paths.iter().any(|p| route_shape(p) == shape) {
            return Err(PluginError::RouteConflict {
                plugin: self.name.clone(),
                path: path.to_string(),
            });
        }

        let router = std::mem::take(&mut self.router);
        self.router = router.route(path, method_router);
        self.paths.push(path.to_string());
        tracing::debug!(plugin = %self.name, path = %path, "plugin route added");
        Ok(self)
    }

    /// Paths added so far, in order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// The added paths and the collected router, or `None` for the router if
    /// the plugin added no routes.
    pub(crate) fn into_parts(self) -> (Vec<String>, Option<Router<AppState>>) {
        let router = (!self.paths.is_empty()).then_some(self.router);
        (self.paths, router)
    }
}

/// Normalized form of a route path used for conflict checks: every
/// `{param}` segment becomes `{}` and every `{*rest}` segment becomes `{*}`,
/// since the router treats paths differing only in parameter names as the
/// same route.
pub(crate) fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
