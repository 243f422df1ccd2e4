//! Admin routes for plugins: the enable toggle and the settings form.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Form, Router};
use tower_sessions::Session;

use crate::form::generate_csrf_token;
use crate::middleware::SiteContext;
use crate::plugin::{PluginError, lifecycle, record};
use crate::state::AppState;

use super::helpers::{page_context, render, require_admin, require_csrf, toast, toast_header};

/// Flip a plugin's enabled flag and answer with the replacement button.
///
/// GET /admin/plugins/enable/{name}
async fn toggle_plugin(
    State(state): State<AppState>,
    session: Session,
    Path(name): Path<String>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &session).await {
        return rejection;
    }

    let enabled = match lifecycle::toggle(state.plugins(), state.db(), &name).await {
        Ok(enabled) => enabled,
        Err(PluginError::NotFound { .. }) => {
            return toast(StatusCode::NOT_FOUND, "Plugin not found");
        }
        Err(e) => {
            tracing::error!(plugin = %name, error = %e, "failed to toggle plugin");
            return toast(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update plugin");
        }
    };

    let mut context = tera::Context::new();
    context.insert("plugin", &serde_json::json!({ "name": name, "enabled": enabled }));

    let message = format!(
        "Plugin {} successfully, restart the server to see changes",
        if enabled { "enabled" } else { "disabled" }
    );

    let response = render(&state, "admin/plugin-button.html", &context);
    ([toast_header(&message)], response).into_response()
}

/// Settings form for one plugin.
///
/// GET /admin/plugins/{name}/settings
async fn plugin_settings_form(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
    Path(name): Path<String>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &session).await {
        return rejection;
    }

    let Some(plugin) = state.plugins().get_by_name(&name) else {
        return toast(StatusCode::NOT_FOUND, "Plugin not found");
    };

    let settings = plugin.settings(state.db()).await;
    let csrf_token = generate_csrf_token(&session).await.unwrap_or_default();

    let mut context = page_context(&site, &session).await;
    context.insert("plugin_name", plugin.name());
    context.insert("plugin_settings", &settings);
    context.insert("csrf_token", &csrf_token);

    render(&state, "admin/plugin-settings.html", &context)
}

/// Save a plugin's settings. Only keys the plugin declares are accepted.
///
/// POST /admin/plugins/{name}/settings
async fn update_plugin_settings(
    State(state): State<AppState>,
    session: Session,
    Path(name): Path<String>,
    Form(mut form): Form<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &session).await {
        return rejection;
    }

    let token = form.remove("_token").unwrap_or_default();
    if let Err(rejection) = require_csrf(&session, &token).await {
        return rejection;
    }

    let Some(plugin) = state.plugins().get_by_name(&name) else {
        return toast(StatusCode::NOT_FOUND, "Plugin not found");
    };

    let mut settings = plugin.settings(state.db()).await;
    for key in plugin.default_settings().into_keys() {
        if let Some(value) = form.remove(&key) {
            settings.insert(key, value);
        }
    }

    match record::update_settings(state.db(), &name, &settings).await {
        Ok(true) => {
            tracing::info!(plugin = %name, "plugin settings updated");
            toast(StatusCode::OK, "Settings updated successfully")
        }
        Ok(false) => toast(StatusCode::NOT_FOUND, "Plugin not found"),
        Err(e) => {
            tracing::error!(plugin = %name, error = %e, "failed to update plugin settings");
            toast(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update settings")
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/plugins/enable/{name}", get(toggle_plugin))
        .route(
            "/admin/plugins/{name}/settings",
            get(plugin_settings_form).post(update_plugin_settings),
        )
}
