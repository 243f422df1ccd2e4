//! Session management.
//!
//! Sessions live in Redis when `REDIS_URL` is configured and in process
//! memory otherwise.

use anyhow::{Context, Result};
use fred::prelude::*;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_redis_store::RedisStore;

/// Default session expiry (24 hours).
pub const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 24;

/// Session key holding the logged-in user's id.
pub const SESSION_USER_ID: &str = "user_id";

/// Cookie settings shared by both session backends.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub same_site: SameSite,
    pub secure: bool,
}

impl CookiePolicy {
    pub fn new(same_site: &str, secure: bool) -> Self {
        let same_site = match same_site {
            "lax" => SameSite::Lax,
            "none" => SameSite::None,
            _ => SameSite::Strict,
        };
        Self { same_site, secure }
    }
}

/// Wrap a store in a session layer with the configured cookie policy.
pub fn session_layer<S>(store: S, policy: CookiePolicy) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_secure(policy.secure)
        .with_http_only(true)
        .with_same_site(policy.same_site)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            DEFAULT_SESSION_EXPIRY_HOURS,
        )))
}

/// In-process session store.
pub fn memory_store() -> MemoryStore {
    MemoryStore::default()
}

/// Connect a Redis-backed session store.
pub async fn redis_store(redis_url: &str) -> Result<RedisStore<Pool>> {
    let config = Config::from_url(redis_url).context("failed to parse Redis URL")?;

    let pool = Builder::from_config(config)
        .build_pool(1)
        .context("failed to create Redis pool")?;

    pool.init()
        .await
        .context("failed to connect to Redis for sessions")?;

    Ok(RedisStore::new(pool))
}
