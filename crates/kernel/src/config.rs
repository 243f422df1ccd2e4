//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// SQLite connection URL (default: `sqlite://inkpress.db?mode=rwc`).
    pub database_url: String,

    /// Maximum database connections in pool (default: 5).
    pub database_max_connections: u32,

    /// Redis connection URL. When set, sessions are stored in Redis;
    /// otherwise they live in process memory.
    pub redis_url: Option<String>,

    /// Path to the page templates directory (default: ./templates).
    pub templates_dir: PathBuf,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "strict").
    pub cookie_same_site: String,

    /// Send the session cookie only over HTTPS (default: true).
    pub cookie_secure: bool,

    /// Username of the bootstrap admin account.
    pub admin_username: Option<String>,

    /// Password of the bootstrap admin account.
    pub admin_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "sqlite://inkpress.db?mode=rwc".to_string(),
            database_max_connections: 5,
            redis_url: None,
            templates_dir: PathBuf::from("./templates"),
            cors_allowed_origins: vec!["*".to_string()],
            cookie_same_site: "strict".to_string(),
            cookie_secure: true,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match env::var("PORT") {
            Ok(v) => v.parse().context("PORT must be a valid u16")?,
            Err(_) => defaults.port,
        };

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);

        let database_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(v) => v
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?,
            Err(_) => defaults.database_max_connections,
        };

        let redis_url = env::var("REDIS_URL").ok().filter(|s| !s.is_empty());

        let templates_dir = env::var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.templates_dir);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or(defaults.cors_allowed_origins);

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or(defaults.cookie_same_site)
            .to_lowercase();

        let cookie_secure = match env::var("COOKIE_SECURE") {
            Ok(v) => parse_bool(&v).context("COOKIE_SECURE must be true or false")?,
            Err(_) => defaults.cookie_secure,
        };

        let admin_username = env::var("ADMIN_USERNAME").ok().filter(|s| !s.is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty());

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            redis_url,
            templates_dir,
            cors_allowed_origins,
            cookie_same_site,
            cookie_secure,
            admin_username,
            admin_password,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
