//! Shared route helpers for page rendering, access checks and HTMX toasts.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use tower_sessions::Session;

use crate::form::verify_csrf_token;
use crate::middleware::SiteContext;
use crate::models::User;
use crate::session::SESSION_USER_ID;
use crate::state::AppState;

/// HTMX response header used to trigger client-side events.
pub const HX_TRIGGER: HeaderName = HeaderName::from_static("hx-trigger");

/// Id of the logged-in user, if any.
pub async fn session_user_id(session: &Session) -> Option<i64> {
    session.get(SESSION_USER_ID).await.ok().flatten()
}

/// Require an authenticated user, or redirect to login.
pub async fn require_login(state: &AppState, session: &Session) -> Result<User, Response> {
    if let Some(id) = session_user_id(session).await
        && let Ok(Some(user)) = User::find_by_id(state.db(), id).await
    {
        return Ok(user);
    }

    Err(Redirect::to("/user/login").into_response())
}

/// Require an authenticated **admin** user, or redirect/reject.
///
/// Redirects to `/user/login` if the session has no valid user. Returns 403
/// if the user exists but is not an admin.
pub async fn require_admin(state: &AppState, session: &Session) -> Result<User, Response> {
    let user = require_login(state, session).await?;
    if user.is_admin {
        return Ok(user);
    }

    Err((StatusCode::FORBIDDEN, Html("Access denied")).into_response())
}

/// Verify a submitted CSRF token, or answer 403.
pub async fn require_csrf(session: &Session, token: &str) -> Result<(), Response> {
    match verify_csrf_token(session, token).await {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err((
            StatusCode::FORBIDDEN,
            Html("Invalid or expired form token. Please reload the page and try again."),
        )
            .into_response()),
    }
}

/// Build a context with the site settings projection and login status.
pub async fn page_context(site: &SiteContext, session: &Session) -> tera::Context {
    let mut context = tera::Context::new();
    context.insert("settings", &site.settings().to_template_map());
    context.insert(
        "user_authenticated",
        &session_user_id(session).await.is_some(),
    );
    context
}

/// Render a template, turning render failures into an error page.
pub fn render(state: &AppState, template: &str, context: &tera::Context) -> Response {
    match state.theme().render(template, context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, template = %template, "failed to render template");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!(
                    r#"<!DOCTYPE html>
<html><head><title>Error</title></head>
<body><h1>Template Error</h1><pre>{}</pre></body></html>"#,
                    html_escape(&format!("{e:#}"))
                )),
            )
                .into_response()
        }
    }
}

/// `HX-Trigger` header value that shows an inline notification.
pub fn toast_header(message: &str) -> (HeaderName, HeaderValue) {
    let payload = serde_json::json!({ "showToast": message }).to_string();

    // Header values must be visible ASCII; escape the rest as JSON \u units.
    let mut ascii = String::with_capacity(payload.len());
    for c in payload.chars() {
        if c.is_ascii() {
            ascii.push(c);
        } else {
            for unit in c.encode_utf16(&mut [0; 2]) {
                ascii.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }

    let value = HeaderValue::from_str(&ascii)
        .unwrap_or_else(|_| HeaderValue::from_static(r#"{"showToast":"Done"}"#));
    (HX_TRIGGER, value)
}

/// Response carrying only an inline notification.
pub fn toast(status: StatusCode, message: &str) -> Response {
    (status, [toast_header(message)], Html(html_escape(message))).into_response()
}

/// HTML-escape a string for safe output.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escape_special_chars() {
        assert_eq!(
            html_escape("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
        assert_eq!(html_escape("a & b"), "a &amp; b");
    }

    #[test]
    fn toast_header_is_json() {
        let (name, value) = toast_header("Settings updated successfully");
        assert_eq!(name, HX_TRIGGER);
        let parsed: serde_json::Value =
            serde_json::from_slice(value.as_bytes()).unwrap_or_default();
        assert_eq!(parsed["showToast"], "Settings updated successfully");
    }

    #[test]
    fn toast_header_escapes_non_ascii() {
        let (_, value) = toast_header("Réglages enregistrés");
        assert!(value.as_bytes().is_ascii());
        let parsed: serde_json::Value =
            serde_json::from_slice(value.as_bytes()).unwrap_or_default();
        assert_eq!(parsed["showToast"], "Réglages enregistrés");
    }
}
