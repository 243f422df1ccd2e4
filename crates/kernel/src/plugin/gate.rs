//! Runtime gating of plugin routes.
//!
//! A plugin's routes exist only if its `setup` ran at boot, but the admin can
//! disable it while the server is live. Every request to a plugin route
//! therefore re-reads the plugin record and answers 404 while the flag is
//! off.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sqlx::SqlitePool;

use super::record;
use crate::state::AppState;

/// State for one plugin's gate.
#[derive(Clone)]
pub struct GateState {
    db: SqlitePool,
    plugin: Arc<str>,
}

/// Wrap a plugin router so its routes answer 404 while the plugin is
/// disabled. The router must contain at least one route.
pub fn gated(router: Router<AppState>, db: SqlitePool, plugin: &str) -> Router<AppState> {
    let gate = GateState {
        db,
        plugin: Arc::from(plugin),
    };
    router.route_layer(axum::middleware::from_fn_with_state(gate, require_enabled))
}

/// Middleware that lets the request through only while the plugin is enabled.
pub async fn require_enabled(
    State(gate): State<GateState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match record::is_enabled(&gate.db, &gate.plugin).await {
        Ok(true) => next.run(request).await,
        Ok(false) => (StatusCode::NOT_FOUND, "Plugin not enabled").into_response(),
        Err(e) => {
            tracing::error!(plugin = %gate.plugin, error = %e, "failed to check plugin status");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}
