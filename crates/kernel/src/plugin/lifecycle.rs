//! Plugin lifecycle: boot-time setup, the enable toggle and shutdown.

use std::collections::HashSet;

use axum::Router;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use super::host::route_shape;
use super::{PluginError, PluginHost, PluginRegistry, PluginState, gate, record};
use crate::routes::KERNEL_PATHS;
use crate::state::AppState;
use crate::theme::ThemeEngine;

/// Run `setup` for every registered plugin whose record is enabled.
///
/// Plugins are evaluated in registration order, each at most once per
/// registry; a second call only sees plugins registered since the first. A
/// failing plugin is logged and marked [`PluginState::Failed`] without
/// stopping the others. So is a plugin that claims a path the kernel or an
/// earlier plugin already serves; its routes are dropped. Returns the merged,
/// gated routes of every plugin that came up.
pub async fn initialize_all(
    registry: &PluginRegistry,
    pool: &SqlitePool,
    theme: &mut ThemeEngine,
) -> Router<AppState> {
    let mut router = Router::new();
    let mut claimed: HashSet<String> = KERNEL_PATHS.iter().map(|p| route_shape(p)).collect();

    for plugin in registry.get_all() {
        let name = plugin.name();
        if registry.state(name) != Some(PluginState::Registered) {
            continue;
        }

        let enabled = match record::is_enabled(pool, name).await {
            Ok(enabled) => enabled,
            Err(e) => {
                error!(plugin = %name, error = %e, "failed to read plugin record, leaving it dormant");
                false
            }
        };

        if !enabled {
            registry.set_boot_state(name, PluginState::Dormant);
            info!(plugin = %name, "plugin disabled, skipping setup");
            continue;
        }

        let settings = plugin.settings(pool).await;
        let mut host = PluginHost::new(name, pool.clone(), theme, settings);

        match plugin.setup(&mut host).await {
            Ok(()) => {
                let (paths, routes) = host.into_parts();
                if let Some(path) = paths.iter().find(|p| claimed.contains(&route_shape(p))) {
                    registry.set_boot_state(name, PluginState::Failed);
                    error!(plugin = %name, path = %path, "plugin route conflicts with an existing route");
                    continue;
                }

                claimed.extend(paths.iter().map(|p| route_shape(p)));
                if let Some(routes) = routes {
                    router = router.merge(gate::gated(routes, pool.clone(), name));
                }
                registry.set_boot_state(name, PluginState::Active);
                info!(plugin = %name, routes = paths.len(), "plugin initialized");
            }
            Err(e) => {
                registry.set_boot_state(name, PluginState::Failed);
                error!(plugin = %name, error = %e, "plugin setup failed");
            }
        }
    }

    router
}

/// Flip a registered plugin's enabled flag.
///
/// Does not call `setup` or `teardown`; the new flag takes effect on the
/// next boot. Returns the new flag, or [`PluginError::NotFound`] when the
/// plugin is unknown or its record is gone.
pub async fn toggle(
    registry: &PluginRegistry,
    pool: &SqlitePool,
    name: &str,
) -> Result<bool, PluginError> {
    if registry.get_by_name(name).is_none() {
        return Err(PluginError::NotFound {
            plugin: name.to_string(),
        });
    }

    let enabled = record::toggle(pool, name)
        .await
        .map_err(|e| PluginError::persistence(name, e))?
        .ok_or_else(|| PluginError::NotFound {
            plugin: name.to_string(),
        })?;

    registry.mark_toggled(name);
    info!(plugin = %name, enabled, "plugin toggled; restart to apply");

    Ok(enabled)
}

/// Call `teardown` on every plugin that is running. Safe to call more than
/// once; each plugin is torn down only the first time.
pub async fn teardown_all(registry: &PluginRegistry) {
    for plugin in registry.take_running() {
        match plugin.teardown().await {
            Ok(()) => info!(plugin = %plugin.name(), "plugin torn down"),
            Err(e) => warn!(plugin = %plugin.name(), error = %e, "plugin teardown failed"),
        }
    }
}
