#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Plugin registration, boot-time setup, toggling and teardown, driven
//! through the real kernel.

use std::sync::Arc;

use axum::http::StatusCode;

use inkpress_kernel::plugin::record::{self, NewPluginRecord};
use inkpress_kernel::plugin::{Plugin, PluginError, PluginRegistry, PluginState, lifecycle};
use inkpress_kernel::plugins;

mod common;
use common::{CountingPlugin, TestApp, response_json, response_text, test_pool, toast_message};

/// Persist an enabled record for `name` before the first boot.
async fn seed_enabled(pool: &sqlx::SqlitePool, name: &str) {
    record::register(
        pool,
        &NewPluginRecord {
            name,
            author: "tester",
            version: "0.1",
            enabled: true,
            settings: "{}".to_string(),
        },
    )
    .await
    .unwrap();
}

async fn record_count(pool: &sqlx::SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM plugin")
        .fetch_one(pool)
        .await
        .unwrap()
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn register_creates_one_disabled_record_with_defaults() {
    let pool = test_pool().await;
    let plugin = Arc::new(CountingPlugin::new("Alpha"));
    let mut registry = PluginRegistry::new();

    assert!(registry.register(plugin.clone(), &pool).await.unwrap());
    assert!(!registry.register(plugin.clone(), &pool).await.unwrap());

    assert_eq!(registry.len(), 1);
    assert_eq!(record_count(&pool).await, 1);
    assert_eq!(registry.state("Alpha"), Some(PluginState::Registered));

    let stored = record::find_by_name(&pool, "Alpha").await.unwrap().unwrap();
    assert!(!stored.enabled);
    assert_eq!(stored.author, "tester");
    assert_eq!(stored.version, "0.1");
    let settings: serde_json::Value = serde_json::from_str(&stored.settings).unwrap();
    assert_eq!(
        settings,
        serde_json::json!({ "greeting": "hello", "color": "blue" })
    );
}

#[tokio::test]
async fn reboot_does_not_duplicate_records() {
    let pool = test_pool().await;
    TestApp::boot(pool.clone(), plugins::builtin()).await;
    TestApp::boot(pool.clone(), plugins::builtin()).await;

    assert_eq!(record_count(&pool).await, 2);
    let names: Vec<String> = record::all(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["LatestPostsPlugin", "ShopPlugin"]);
}

#[tokio::test]
async fn removed_record_is_revived_with_defaults() {
    let pool = test_pool().await;
    seed_enabled(&pool, "Alpha").await;
    assert!(record::soft_delete(&pool, "Alpha").await.unwrap());
    assert!(record::find_by_name(&pool, "Alpha").await.unwrap().is_none());

    let mut registry = PluginRegistry::new();
    registry
        .register(Arc::new(CountingPlugin::new("Alpha")), &pool)
        .await
        .unwrap();

    let revived = record::find_by_name(&pool, "Alpha").await.unwrap().unwrap();
    assert!(!revived.enabled);
    assert!(revived.deleted_at.is_none());
    assert!(revived.settings.contains("greeting"));
    assert_eq!(record_count(&pool).await, 1);
}

// =============================================================================
// Boot-time setup
// =============================================================================

#[tokio::test]
async fn disabled_plugin_is_never_set_up() {
    let plugin = Arc::new(CountingPlugin::new("Alpha"));
    let calls = plugin.calls.clone();
    let app = TestApp::new(vec![plugin]).await;

    assert_eq!(calls.setups(), 0);
    assert_eq!(app.state.plugins().state("Alpha"), Some(PluginState::Dormant));

    let response = app.get("/alpha", "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn enabled_plugin_is_set_up_once_and_serves_routes() {
    let pool = test_pool().await;
    seed_enabled(&pool, "Alpha").await;

    let plugin = Arc::new(CountingPlugin::new("Alpha"));
    let calls = plugin.calls.clone();
    let app = TestApp::boot(pool, vec![plugin]).await;

    assert_eq!(calls.setups(), 1);
    assert_eq!(app.state.plugins().state("Alpha"), Some(PluginState::Active));

    let response = app.get("/alpha", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_text(response).await, "Alpha says hi");

    // A second pass over the same registry sets nothing up again.
    let mut theme = inkpress_kernel::theme::ThemeEngine::empty();
    let _ = lifecycle::initialize_all(app.state.plugins(), &app.db, &mut theme).await;
    assert_eq!(calls.setups(), 1);
}

#[tokio::test]
async fn failing_setup_does_not_stop_later_plugins() {
    let pool = test_pool().await;
    seed_enabled(&pool, "Alpha").await;
    seed_enabled(&pool, "Beta").await;

    let alpha = Arc::new(CountingPlugin::new("Alpha").failing());
    let beta = Arc::new(CountingPlugin::new("Beta"));
    let (alpha_calls, beta_calls) = (alpha.calls.clone(), beta.calls.clone());

    let app = TestApp::boot(pool, vec![alpha, beta]).await;

    assert_eq!(alpha_calls.setups(), 1);
    assert_eq!(beta_calls.setups(), 1);
    assert_eq!(app.state.plugins().state("Alpha"), Some(PluginState::Failed));
    assert_eq!(app.state.plugins().state("Beta"), Some(PluginState::Active));

    assert_eq!(app.get("/alpha", "").await.status(), StatusCode::NOT_FOUND);
    let response = app.get("/beta", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_text(response).await, "Beta says hi");
}

#[tokio::test]
async fn clashing_plugin_route_fails_only_that_plugin() {
    let pool = test_pool().await;
    for name in ["Alpha", "ALPHA", "Beta"] {
        seed_enabled(&pool, name).await;
    }

    let app = TestApp::boot(
        pool,
        vec![
            Arc::new(CountingPlugin::new("Alpha")),
            Arc::new(CountingPlugin::new("ALPHA")),
            Arc::new(CountingPlugin::new("Beta")),
        ],
    )
    .await;

    let registry = app.state.plugins();
    assert_eq!(registry.state("Alpha"), Some(PluginState::Active));
    assert_eq!(registry.state("ALPHA"), Some(PluginState::Failed));
    assert_eq!(registry.state("Beta"), Some(PluginState::Active));

    assert_eq!(response_text(app.get("/alpha", "").await).await, "Alpha says hi");
    assert_eq!(response_text(app.get("/beta", "").await).await, "Beta says hi");
}

#[tokio::test]
async fn plugin_cannot_shadow_kernel_routes() {
    let pool = test_pool().await;
    seed_enabled(&pool, "Health").await;
    seed_enabled(&pool, "Beta").await;

    let app = TestApp::boot(
        pool,
        vec![
            Arc::new(CountingPlugin::new("Health")),
            Arc::new(CountingPlugin::new("Beta")),
        ],
    )
    .await;

    assert_eq!(app.state.plugins().state("Health"), Some(PluginState::Failed));
    assert_eq!(app.state.plugins().state("Beta"), Some(PluginState::Active));

    let response = app.get("/health", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status"], "healthy");
    assert_eq!(app.get("/beta", "").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn plugin_adding_a_path_twice_fails_setup() {
    let pool = test_pool().await;
    seed_enabled(&pool, "Gamma").await;
    seed_enabled(&pool, "Beta").await;

    let gamma = Arc::new(CountingPlugin::new("Gamma").also_route("/gamma"));
    let calls = gamma.calls.clone();
    let app = TestApp::boot(pool, vec![gamma, Arc::new(CountingPlugin::new("Beta"))]).await;

    assert_eq!(calls.setups(), 1);
    assert_eq!(app.state.plugins().state("Gamma"), Some(PluginState::Failed));
    assert_eq!(app.get("/gamma", "").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/beta", "").await.status(), StatusCode::OK);
}

// =============================================================================
// Toggle
// =============================================================================

#[tokio::test]
async fn toggle_twice_restores_flag_and_state() {
    let app = TestApp::new(vec![Arc::new(CountingPlugin::new("Alpha"))]).await;
    let registry = app.state.plugins();

    assert!(lifecycle::toggle(registry, &app.db, "Alpha").await.unwrap());
    assert!(record::is_enabled(&app.db, "Alpha").await.unwrap());
    assert_eq!(registry.state("Alpha"), Some(PluginState::Toggled));

    assert!(!lifecycle::toggle(registry, &app.db, "Alpha").await.unwrap());
    assert!(!record::is_enabled(&app.db, "Alpha").await.unwrap());
    assert_eq!(registry.state("Alpha"), Some(PluginState::Dormant));
}

#[tokio::test]
async fn toggle_unknown_plugin_is_not_found_and_writes_nothing() {
    let app = TestApp::new(vec![Arc::new(CountingPlugin::new("Alpha"))]).await;

    let err = lifecycle::toggle(app.state.plugins(), &app.db, "Ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::NotFound { .. }));
    assert_eq!(err.plugin(), "Ghost");

    assert_eq!(record_count(&app.db).await, 1);
    assert!(!record::is_enabled(&app.db, "Alpha").await.unwrap());
}

#[tokio::test]
async fn toggle_over_http_requires_admin() {
    let app = TestApp::new(plugins::builtin()).await;

    let response = app.get("/admin/plugins/enable/ShopPlugin", "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/user/login");
    assert!(!record::is_enabled(&app.db, "ShopPlugin").await.unwrap());
}

#[tokio::test]
async fn toggle_over_http_unknown_plugin_is_404() {
    let app = TestApp::new(plugins::builtin()).await;
    let cookies = app.login_admin().await;

    let response = app.get("/admin/plugins/enable/Ghost", &cookies).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(toast_message(&response).as_deref(), Some("Plugin not found"));
}

#[tokio::test]
async fn shop_enabled_by_admin_comes_up_after_restart() {
    let pool = test_pool().await;
    let app = TestApp::boot(pool.clone(), plugins::builtin()).await;
    let cookies = app.login_admin().await;

    assert_eq!(
        app.state.plugins().state("ShopPlugin"),
        Some(PluginState::Dormant)
    );
    assert_eq!(app.get("/shop", "").await.status(), StatusCode::NOT_FOUND);

    let response = app.get("/admin/plugins/enable/ShopPlugin", &cookies).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        toast_message(&response).as_deref(),
        Some("Plugin enabled successfully, restart the server to see changes")
    );
    let button = response_text(response).await;
    assert!(button.contains(r#"id="plugin-ShopPlugin""#));
    assert!(button.contains("Disable"));

    assert!(record::is_enabled(&pool, "ShopPlugin").await.unwrap());
    assert_eq!(
        app.state.plugins().state("ShopPlugin"),
        Some(PluginState::Toggled)
    );

    // Still not reachable before the restart.
    assert_eq!(app.get("/shop", "").await.status(), StatusCode::NOT_FOUND);

    let restarted = TestApp::boot(pool, plugins::builtin()).await;
    assert_eq!(
        restarted.state.plugins().state("ShopPlugin"),
        Some(PluginState::Active)
    );

    let response = restarted.get("/shop", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response_text(response).await;
    assert!(html.contains("Shop Name"));
    assert!(html.contains("No products found."));
}

#[tokio::test]
async fn active_plugin_disabled_live_answers_404_at_once() {
    let pool = test_pool().await;
    seed_enabled(&pool, "Alpha").await;
    let app = TestApp::boot(pool, vec![Arc::new(CountingPlugin::new("Alpha"))]).await;
    let cookies = app.login_admin().await;

    assert_eq!(app.get("/alpha", "").await.status(), StatusCode::OK);

    let response = app.get("/admin/plugins/enable/Alpha", &cookies).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        toast_message(&response).as_deref(),
        Some("Plugin disabled successfully, restart the server to see changes")
    );

    let response = app.get("/alpha", "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_text(response).await, "Plugin not enabled");

    // Re-enabling needs no restart since setup already ran.
    app.get("/admin/plugins/enable/Alpha", &cookies).await;
    assert_eq!(app.get("/alpha", "").await.status(), StatusCode::OK);
}

// =============================================================================
// Teardown
// =============================================================================

#[tokio::test]
async fn teardown_runs_once_for_running_plugins_only() {
    let pool = test_pool().await;
    seed_enabled(&pool, "Alpha").await;
    seed_enabled(&pool, "Broken").await;

    let alpha = Arc::new(CountingPlugin::new("Alpha"));
    let broken = Arc::new(CountingPlugin::new("Broken").failing());
    let dormant = Arc::new(CountingPlugin::new("Dormant"));
    let calls = [alpha.calls.clone(), broken.calls.clone(), dormant.calls.clone()];

    let app = TestApp::boot(pool, vec![alpha, broken, dormant]).await;
    let registry = app.state.plugins_handle();

    lifecycle::teardown_all(&registry).await;
    lifecycle::teardown_all(&registry).await;

    assert_eq!(calls[0].teardowns(), 1);
    assert_eq!(calls[1].teardowns(), 0);
    assert_eq!(calls[2].teardowns(), 0);
}

// =============================================================================
// Plugin settings
// =============================================================================

#[tokio::test]
async fn settings_fill_in_missing_defaults() {
    let app = TestApp::new(vec![Arc::new(CountingPlugin::new("Alpha"))]).await;
    let plugin = app.state.plugins().get_by_name("Alpha").unwrap();

    sqlx::query("UPDATE plugin SET settings = ? WHERE name = ?")
        .bind(r#"{"greeting":"hey"}"#)
        .bind("Alpha")
        .execute(&app.db)
        .await
        .unwrap();

    let settings = plugin.settings(&app.db).await;
    assert_eq!(settings["greeting"], "hey");
    assert_eq!(settings["color"], "blue");

    sqlx::query("UPDATE plugin SET settings = 'not json' WHERE name = ?")
        .bind("Alpha")
        .execute(&app.db)
        .await
        .unwrap();
    assert_eq!(plugin.settings(&app.db).await, plugin.default_settings());
}

#[tokio::test]
async fn settings_form_saves_declared_keys_only() {
    let app = TestApp::new(vec![Arc::new(CountingPlugin::new("Alpha"))]).await;
    let cookies = app.login_admin().await;

    let response = app.get("/admin/plugins/Alpha/settings", &cookies).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response_text(response).await;
    assert!(html.contains(r#"name="greeting""#));
    assert!(html.contains(r#"value="blue""#));

    let token = common::extract_csrf_token(&html).unwrap();
    let response = app
        .post_form(
            "/admin/plugins/Alpha/settings",
            &cookies,
            &[("_token", token.as_str()), ("greeting", "bonjour"), ("rogue", "x")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        toast_message(&response).as_deref(),
        Some("Settings updated successfully")
    );

    let stored = record::load_settings(
        &app.db,
        "Alpha",
        &app.state.plugins().get_by_name("Alpha").unwrap().default_settings(),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(stored["greeting"], "bonjour");
    assert_eq!(stored["color"], "blue");
    assert!(!stored.contains_key("rogue"));
}

#[tokio::test]
async fn settings_form_rejects_stale_token() {
    let app = TestApp::new(vec![Arc::new(CountingPlugin::new("Alpha"))]).await;
    let cookies = app.login_admin().await;

    let response = app
        .post_form(
            "/admin/plugins/Alpha/settings",
            &cookies,
            &[("_token", "forged"), ("greeting", "bonjour")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let plugin = app.state.plugins().get_by_name("Alpha").unwrap();
    assert_eq!(plugin.settings(&app.db).await["greeting"], "hello");
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn dashboard_lists_plugins_with_state() {
    let app = TestApp::new(plugins::builtin()).await;
    let cookies = app.login_admin().await;

    let response = app.get("/admin", &cookies).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response_text(response).await;

    assert!(html.contains("ShopPlugin"));
    assert!(html.contains("LatestPostsPlugin"));
    assert!(html.contains("Ashba22"));
    assert!(html.contains("dormant"));
    assert!(html.contains("0 enabled"));
    assert!(html.contains(r#"hx-get="/admin/plugins/enable/ShopPlugin""#));
}
