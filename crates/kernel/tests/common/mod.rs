#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every test boots the REAL kernel (routes, middleware, plugin lifecycle)
//! over its own in-memory SQLite database. A process restart is simulated
//! by booting a second [`TestApp`] over the same pool.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum::routing::get;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tower::ServiceExt;

use inkpress_kernel::app::{self, App};
use inkpress_kernel::config::Config;
use inkpress_kernel::db;
use inkpress_kernel::plugin::{Plugin, PluginError, PluginHost, PluginSettings};
use inkpress_kernel::state::AppState;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Test configuration: in-memory database, crate templates, plain-HTTP
/// cookies and a bootstrap admin.
pub fn test_config() -> Config {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Config {
        database_url: "sqlite::memory:".to_string(),
        templates_dir: std::path::Path::new(manifest_dir).join("templates"),
        cookie_secure: false,
        admin_username: Some(ADMIN_USERNAME.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        ..Config::default()
    }
}

/// Fresh, migrated in-memory pool.
pub async fn test_pool() -> SqlitePool {
    let pool = db::create_pool(&test_config()).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// Call counters shared between a [`CountingPlugin`] and the test.
#[derive(Debug, Default)]
pub struct Calls {
    setup: AtomicUsize,
    teardown: AtomicUsize,
}

impl Calls {
    pub fn setups(&self) -> usize {
        self.setup.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> usize {
        self.teardown.load(Ordering::SeqCst)
    }
}

/// Plugin that records its setup and teardown calls and serves one route.
pub struct CountingPlugin {
    name: String,
    route: String,
    extra_routes: Vec<String>,
    fail_setup: bool,
    pub calls: Arc<Calls>,
}

impl CountingPlugin {
    /// A plugin serving `GET /<name lowercased>`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            route: format!("/{}", name.to_lowercase()),
            extra_routes: Vec::new(),
            fail_setup: false,
            calls: Arc::new(Calls::default()),
        }
    }

    /// Make `setup` return an error after being counted.
    pub fn failing(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    /// Also serve `path` with the same body.
    pub fn also_route(mut self, path: &str) -> Self {
        self.extra_routes.push(path.to_string());
        self
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

#[async_trait]
impl Plugin for CountingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn author(&self) -> &str {
        "tester"
    }

    fn version(&self) -> &str {
        "0.1"
    }

    fn default_settings(&self) -> PluginSettings {
        PluginSettings::from([
            ("greeting".to_string(), "hello".to_string()),
            ("color".to_string(), "blue".to_string()),
        ])
    }

    async fn setup(&self, host: &mut PluginHost<'_>) -> Result<(), PluginError> {
        self.calls.setup.fetch_add(1, Ordering::SeqCst);
        if self.fail_setup {
            return Err(PluginError::setup(&self.name, "configured to fail"));
        }

        let body = format!("{} says hi", self.name);
        for path in std::iter::once(&self.route).chain(&self.extra_routes) {
            let body = body.clone();
            host.route(path, get(move || async move { body }))?;
        }
        Ok(())
    }

    async fn teardown(&self) -> Result<(), PluginError> {
        self.calls.teardown.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub db: SqlitePool,
    pub state: AppState,
}

impl TestApp {
    /// Boot with the given plugins over a fresh database.
    pub async fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self::boot(test_pool().await, plugins).await
    }

    /// Boot over an existing database, as a restarted process would.
    pub async fn boot(pool: SqlitePool, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        let App { state, router } = app::build(&test_config(), pool.clone(), plugins)
            .await
            .expect("Failed to build app");

        Self {
            router,
            db: pool,
            state,
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Send a request with cookies from a previous response.
    pub async fn request_with_cookies(
        &self,
        mut request: Request<Body>,
        cookies: &str,
    ) -> Response {
        if !cookies.is_empty() {
            request.headers_mut().insert(
                header::COOKIE,
                cookies.parse().expect("Invalid cookie header"),
            );
        }
        self.request(request).await
    }

    pub async fn get(&self, uri: &str, cookies: &str) -> Response {
        self.request_with_cookies(Request::get(uri).body(Body::empty()).unwrap(), cookies)
            .await
    }

    /// POST an urlencoded form.
    pub async fn post_form(&self, uri: &str, cookies: &str, form: &[(&str, &str)]) -> Response {
        let body = form
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        self.request_with_cookies(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
            cookies,
        )
        .await
    }

    /// Fetch a page that renders a form and return its CSRF token.
    pub async fn form_token(&self, uri: &str, cookies: &str) -> String {
        let response = self.get(uri, cookies).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri} failed");
        let html = response_text(response).await;
        extract_csrf_token(&html).expect("form has no _token field")
    }

    /// Log in through the HTML form and return the session cookies.
    ///
    /// # Panics
    ///
    /// Panics if the login does not redirect to the dashboard.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self.get("/user/login", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookies = extract_cookies(&response);
        let token = extract_csrf_token(&response_text(response).await).unwrap();

        let response = self
            .post_form(
                "/user/login",
                &cookies,
                &[
                    ("username", username),
                    ("password", password),
                    ("_token", token.as_str()),
                ],
            )
            .await;

        assert_eq!(
            response.status(),
            StatusCode::SEE_OTHER,
            "Login failed for user '{username}'"
        );
        assert_eq!(response.headers()[header::LOCATION], "/admin");

        let fresh = extract_cookies(&response);
        if fresh.is_empty() { cookies } else { fresh }
    }

    /// Log in as the bootstrap admin.
    pub async fn login_admin(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }
}

/// Cookie header value built from a response's `Set-Cookie` headers.
pub fn extract_cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| {
            // Extract just the cookie name=value, ignoring attributes
            cookie.split(';').next()
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn response_text(response: Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&body).to_string()
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap_or_else(|_| {
        let text = String::from_utf8_lossy(&body);
        panic!("Failed to parse JSON: {text}");
    })
}

/// Value of the `HX-Trigger` toast, if the response carries one.
pub fn toast_message(response: &Response) -> Option<String> {
    let raw = response.headers().get("hx-trigger")?.to_str().ok()?;
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    value["showToast"].as_str().map(str::to_string)
}

pub fn extract_csrf_token(html: &str) -> Option<String> {
    // Look for: name="_token" value="..."
    let pattern = r#"name="_token" value=""#;
    let start = html.find(pattern)? + pattern.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

/// Minimal form encoding for test payloads.
fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
