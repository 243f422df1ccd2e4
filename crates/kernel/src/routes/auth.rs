//! Authentication routes (login, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::form::generate_csrf_token;
use crate::middleware::SiteContext;
use crate::models::User;
use crate::session::SESSION_USER_ID;
use crate::state::AppState;

use super::helpers::{page_context, render, require_csrf};

/// Form-based login request.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(rename = "_token", default)]
    pub csrf_token: String,
}

/// Login form handler.
///
/// GET /user/login
async fn login_form(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
) -> Response {
    render_login(&state, &site, &session, None, StatusCode::OK).await
}

/// Form-based login handler.
///
/// POST /user/login
async fn login_submit(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    if let Err(rejection) = require_csrf(&session, &form.csrf_token).await {
        return rejection;
    }

    let user = match User::find_by_username(state.db(), &form.username).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "failed to look up user during login");
            return (StatusCode::INTERNAL_SERVER_ERROR, Html("Internal server error"))
                .into_response();
        }
    };

    let Some(user) = user.filter(|u| u.verify_password(&form.password)) else {
        warn!(username = %form.username, "failed login attempt");
        return render_login(
            &state,
            &site,
            &session,
            Some("Invalid username or password."),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    };

    // New session id on privilege change.
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "failed to cycle session id");
        return (StatusCode::INTERNAL_SERVER_ERROR, Html("Internal server error")).into_response();
    }
    if let Err(e) = session.insert(SESSION_USER_ID, user.id).await {
        tracing::error!(error = %e, "failed to insert user_id into session");
        return (StatusCode::INTERNAL_SERVER_ERROR, Html("Internal server error")).into_response();
    }

    info!(user_id = user.id, username = %user.username, "user logged in");
    Redirect::to("/admin").into_response()
}

/// POST /user/logout
async fn logout(session: Session) -> Response {
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "failed to flush session on logout");
    }
    Redirect::to("/").into_response()
}

async fn render_login(
    state: &AppState,
    site: &SiteContext,
    session: &Session,
    error: Option<&str>,
    status: StatusCode,
) -> Response {
    let csrf_token = match generate_csrf_token(session).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to generate CSRF token");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h1>Error</h1><p>Failed to generate form token</p>"),
            )
                .into_response();
        }
    };

    let mut context = page_context(site, session).await;
    context.insert("csrf_token", &csrf_token);
    if let Some(error) = error {
        context.insert("error", error);
    }

    let mut response = render(state, "user/login.html", &context);
    if response.status().is_success() {
        *response.status_mut() = status;
    }
    response
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/login", get(login_form).post(login_submit))
        .route("/user/logout", post(logout))
}
