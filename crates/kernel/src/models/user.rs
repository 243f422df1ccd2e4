//! User model and authentication helpers.

use anyhow::{Context, Result};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db;

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub created_at: i64,
}

/// Input for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl User {
    /// Find a user by ID.
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by id")?;

        Ok(user)
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<Self>> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER(?)")
                .bind(username)
                .fetch_optional(pool)
                .await
                .context("failed to fetch user by username")?;

        Ok(user)
    }

    /// Create a new user.
    pub async fn create(pool: &SqlitePool, input: CreateUser) -> Result<Self> {
        let password_hash = hash_password(&input.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, email, is_admin, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&input.username)
        .bind(&password_hash)
        .bind(&input.email)
        .bind(input.is_admin)
        .bind(db::now())
        .fetch_one(pool)
        .await
        .context("failed to create user")?;

        Ok(user)
    }

    /// Create the bootstrap admin account unless the username is taken.
    ///
    /// Returns `true` if an account was created.
    pub async fn ensure_admin(pool: &SqlitePool, username: &str, password: &str) -> Result<bool> {
        if Self::find_by_username(pool, username).await?.is_some() {
            return Ok(false);
        }

        Self::create(
            pool,
            CreateUser {
                username: username.to_string(),
                password: password.to_string(),
                email: None,
                is_admin: true,
            },
        )
        .await?;

        tracing::info!(username = %username, "created bootstrap admin account");
        Ok(true)
    }

    /// Verify a password against this user's stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against an encoded Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
