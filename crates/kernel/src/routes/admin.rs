//! Admin dashboard.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use serde::Serialize;
use tower_sessions::Session;

use crate::middleware::SiteContext;
use crate::plugin::{PluginState, record};
use crate::state::AppState;

use super::helpers::{page_context, render, require_admin};

/// One row of the plugin table.
#[derive(Debug, Serialize)]
struct PluginRow {
    name: String,
    author: String,
    version: String,
    enabled: bool,
    state: &'static str,
    restart_pending: bool,
}

/// Dashboard listing every registered plugin.
///
/// GET /admin
async fn dashboard(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
) -> Response {
    let user = match require_admin(&state, &session).await {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };

    let mut rows = Vec::with_capacity(state.plugins().len());
    for plugin in state.plugins().get_all() {
        let name = plugin.name();
        let plugin_state = state
            .plugins()
            .state(name)
            .unwrap_or(PluginState::Registered);

        rows.push(PluginRow {
            name: name.to_string(),
            author: plugin.author().to_string(),
            version: plugin.version().to_string(),
            enabled: plugin.enabled(state.db()).await,
            state: plugin_state.as_str(),
            restart_pending: plugin_state == PluginState::Toggled,
        });
    }

    let enabled_count = match record::count_enabled(state.db()).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "failed to count enabled plugins");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("Failed to load plugin statuses."),
            )
                .into_response();
        }
    };

    let mut context = page_context(&site, &session).await;
    context.insert("username", &user.username);
    context.insert("plugins", &rows);
    context.insert("enabled_count", &enabled_count);

    render(&state, "admin/dashboard.html", &context)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/admin", get(dashboard))
}
