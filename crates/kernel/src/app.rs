//! Application assembly: boot sequence and router construction.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use sqlx::SqlitePool;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{SiteSettings, User};
use crate::plugin::{Plugin, PluginRegistry, lifecycle};
use crate::session::{self, CookiePolicy};
use crate::state::AppState;
use crate::theme::ThemeEngine;
use crate::{db, routes};

/// A booted application, ready to serve.
pub struct App {
    pub state: AppState,
    pub router: Router,
}

/// Boot the application over an existing database pool.
///
/// Applies migrations, seeds the site settings row and the bootstrap admin,
/// registers `plugins` in order and runs `setup` for the enabled ones. A
/// plugin that fails to register or set up is logged and left out; it never
/// stops the boot.
pub async fn build(config: &Config, db: SqlitePool, plugins: Vec<Arc<dyn Plugin>>) -> Result<App> {
    db::run_migrations(&db).await?;

    let mut theme = ThemeEngine::new(&config.templates_dir)
        .context("failed to initialize theme engine")?;

    if SiteSettings::create_default(&db).await? {
        info!("site settings initialized");
    }

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
        && User::ensure_admin(&db, username, password).await?
    {
        info!(username = %username, "bootstrap admin created");
    }

    let mut registry = PluginRegistry::new();
    for plugin in plugins {
        let name = plugin.name().to_string();
        match registry.register(plugin, &db).await {
            Ok(true) => {}
            Ok(false) => warn!(plugin = %name, "duplicate plugin name, ignoring"),
            Err(e) => error!(plugin = %name, error = %e, "failed to register plugin"),
        }
    }

    let plugin_routes = lifecycle::initialize_all(&registry, &db, &mut theme).await;
    info!(plugins = registry.len(), "plugins loaded");

    let state = AppState::new(db, theme, Arc::new(registry));
    let router = build_router(config, state.clone(), plugin_routes).await?;

    Ok(App { state, router })
}

async fn build_router(
    config: &Config,
    state: AppState,
    plugin_routes: Router<AppState>,
) -> Result<Router> {
    let policy = CookiePolicy::new(&config.cookie_same_site, config.cookie_secure);

    // Middleware layers (last added = first executed in request flow):
    // TraceLayer → CORS → compression → session → site settings → routes
    let routes = routes::router()
        .merge(plugin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::inject_site_settings,
        ));

    let routes = match &config.redis_url {
        Some(url) => {
            let store = session::redis_store(url).await?;
            info!("sessions stored in Redis");
            routes.layer(session::session_layer(store, policy))
        }
        None => {
            info!("sessions stored in memory");
            routes.layer(session::session_layer(session::memory_store(), policy))
        }
    };

    Ok(routes
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_allowed_origins.len() == 1 && config.cors_allowed_origins[0] == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        // Credentialed CORS cannot use wildcard headers.
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static("hx-request"),
                HeaderName::from_static("hx-target"),
                HeaderName::from_static("hx-current-url"),
            ])
            .expose_headers([crate::routes::helpers::HX_TRIGGER])
            .allow_credentials(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_explicit_origins() {
        let config = Config {
            cors_allowed_origins: vec!["https://example.com".to_string(), "bad\norigin".to_string()],
            ..Config::default()
        };
        // Building must not panic on credentials combined with explicit headers.
        let _layer = build_cors_layer(&config);
    }
}
