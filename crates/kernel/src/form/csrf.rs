//! CSRF token generation and verification.
//!
//! Tokens are random, single-use and kept in the session alongside the time
//! they were issued.

use anyhow::{Result, bail};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tower_sessions::Session;

/// Session key for storing CSRF tokens.
const CSRF_SESSION_KEY: &str = "csrf_tokens";

/// Maximum number of outstanding tokens per session.
const MAX_TOKENS: usize = 10;

/// Token validity period in seconds (1 hour).
const TOKEN_VALIDITY_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IssuedToken {
    token: String,
    issued_at: i64,
}

impl IssuedToken {
    fn is_fresh(&self, now: i64) -> bool {
        now - self.issued_at <= TOKEN_VALIDITY_SECS
    }
}

async fn load(session: &Session) -> Vec<IssuedToken> {
    session
        .get(CSRF_SESSION_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn store(session: &Session, tokens: Vec<IssuedToken>) -> Result<()> {
    session
        .insert(CSRF_SESSION_KEY, tokens)
        .await
        .map_err(|e| anyhow::anyhow!("failed to store CSRF tokens: {e}"))
}

/// Generate a CSRF token and store it in the session.
pub async fn generate_csrf_token(session: &Session) -> Result<String> {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    let issued_at = chrono::Utc::now().timestamp();

    let mut hasher = Sha256::new();
    hasher.update(random_bytes);
    hasher.update(issued_at.to_le_bytes());
    let token = hex::encode(hasher.finalize());

    let mut tokens = load(session).await;
    tokens.retain(|t| t.is_fresh(issued_at));
    tokens.push(IssuedToken {
        token: token.clone(),
        issued_at,
    });
    if tokens.len() > MAX_TOKENS {
        let excess = tokens.len() - MAX_TOKENS;
        tokens.drain(..excess);
    }

    store(session, tokens).await?;
    Ok(token)
}

/// Verify and consume a CSRF token.
pub async fn verify_csrf_token(session: &Session, submitted: &str) -> Result<bool> {
    if submitted.is_empty() {
        bail!("empty CSRF token");
    }

    let now = chrono::Utc::now().timestamp();
    let mut tokens = load(session).await;

    let Some(index) = tokens
        .iter()
        .position(|t| t.token == submitted && t.is_fresh(now))
    else {
        return Ok(false);
    };

    tokens.remove(index);
    tokens.retain(|t| t.is_fresh(now));
    store(session, tokens).await?;

    Ok(true)
}
