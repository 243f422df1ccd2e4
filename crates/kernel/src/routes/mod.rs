//! HTTP route handlers.

pub mod admin;
pub mod auth;
pub mod front;
pub mod health;
pub mod helpers;
pub mod plugin_admin;
pub mod post_admin;
pub mod settings_admin;

use axum::Router;

use crate::state::AppState;

/// Every path the kernel router serves. Plugins may not claim any of them;
/// keep in sync with the module routers below.
pub const KERNEL_PATHS: &[&str] = &[
    "/",
    "/blog/post/{slug}",
    "/sitemap.xml",
    "/user/login",
    "/user/logout",
    "/admin",
    "/admin/posts",
    "/admin/posts/{id}/publish",
    "/admin/posts/{id}/delete",
    "/admin/plugins/enable/{name}",
    "/admin/plugins/{name}/settings",
    "/admin-settings",
    "/update-settings",
    "/health",
];

/// Kernel routes. Plugin routes are merged separately at boot.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(front::router())
        .merge(auth::router())
        .merge(admin::router())
        .merge(post_admin::router())
        .merge(plugin_admin::router())
        .merge(settings_admin::router())
        .merge(health::router())
}
