//! Per-request site settings.
//!
//! Loads the site settings row fresh on every request and stores it in the
//! request extensions, so any handler (plugin routes included) can render
//! with current values.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::models::SiteSettings;
use crate::state::AppState;

/// Site settings as loaded for the current request.
#[derive(Debug, Clone)]
pub struct SiteContext(pub Arc<SiteSettings>);

impl SiteContext {
    pub fn settings(&self) -> &SiteSettings {
        &self.0
    }
}

/// Middleware that attaches a [`SiteContext`] to every request.
pub async fn inject_site_settings(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();

    // Health checks must not depend on the settings table
    if path == "/health" {
        return next.run(request).await;
    }

    let settings = SiteSettings::load_or_default(state.db()).await;
    request
        .extensions_mut()
        .insert(SiteContext(Arc::new(settings)));

    next.run(request).await
}
