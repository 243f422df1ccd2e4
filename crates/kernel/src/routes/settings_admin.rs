//! Site settings admin.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use serde::Deserialize;
use tower_sessions::Session;

use crate::form::generate_csrf_token;
use crate::middleware::SiteContext;
use crate::models::site_settings::THEMES;
use crate::models::{SettingsUpdate, SiteSettings};
use crate::state::AppState;

use super::helpers::{page_context, render, require_admin, require_csrf, toast};

/// Submitted settings form.
#[derive(Debug, Deserialize)]
struct SettingsForm {
    #[serde(rename = "_token", default)]
    token: String,
    #[serde(flatten)]
    fields: SettingsUpdate,
}

/// GET /admin-settings
async fn settings_form(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
) -> Response {
    if let Err(rejection) = require_admin(&state, &session).await {
        return rejection;
    }

    let csrf_token = generate_csrf_token(&session).await.unwrap_or_default();

    let mut context = page_context(&site, &session).await;
    context.insert("site", site.settings());
    context.insert("themes", THEMES);
    context.insert("csrf_token", &csrf_token);

    render(&state, "admin/settings.html", &context)
}

/// POST /update-settings
async fn update_settings(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SettingsForm>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &session).await {
        return rejection;
    }
    if let Err(rejection) = require_csrf(&session, &form.token).await {
        return rejection;
    }

    match SiteSettings::update(state.db(), &form.fields).await {
        Ok(_) => {
            tracing::info!("site settings updated");
            toast(StatusCode::OK, "Settings updated successfully")
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to update site settings");
            toast(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error updating settings, please try again",
            )
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin-settings", get(settings_form))
        .route("/update-settings", post(update_settings))
}
