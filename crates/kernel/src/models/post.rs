//! Blog post model.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db;

#[allow(clippy::expect_used)]
static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Post record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image_url: String,
    pub published: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub published: bool,
}

impl Post {
    /// Create a post, deriving a slug from the title that no other post uses.
    pub async fn create(pool: &SqlitePool, input: CreatePost) -> Result<Self> {
        let slug = Self::unique_slug(pool, &input.title).await?;
        let now = db::now();

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (title, slug, content, image_url, published, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.content)
        .bind(&input.image_url)
        .bind(input.published)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to create post")?;

        Ok(post)
    }

    /// Most recent published posts, newest first.
    pub async fn latest_published(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE published = 1 ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("failed to fetch latest posts")?;

        Ok(posts)
    }

    /// Find a published post by its slug.
    pub async fn find_published_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>> {
        let post =
            sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE slug = ? AND published = 1")
                .bind(slug)
                .fetch_optional(pool)
                .await
                .context("failed to fetch post by slug")?;

        Ok(post)
    }

    /// Every published post, newest first (sitemap source).
    pub async fn all_published(pool: &SqlitePool) -> Result<Vec<Self>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE published = 1 ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(pool)
        .await
        .context("failed to fetch published posts")?;

        Ok(posts)
    }

    /// Every post, drafts included, newest first (admin listing).
    pub async fn all(pool: &SqlitePool) -> Result<Vec<Self>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(pool)
        .await
        .context("failed to list posts")?;

        Ok(posts)
    }

    /// Flip the published flag. Returns the new value, or `None` if the post
    /// does not exist.
    pub async fn toggle_published(pool: &SqlitePool, id: i64) -> Result<Option<bool>> {
        let published = sqlx::query_scalar::<_, bool>(
            "UPDATE posts SET published = NOT published, updated_at = ? WHERE id = ? RETURNING published",
        )
        .bind(db::now())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to toggle post status")?;

        Ok(published)
    }

    /// Delete a post. Returns `false` if it did not exist.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete post")?;

        Ok(result.rows_affected() > 0)
    }

    async fn unique_slug(pool: &SqlitePool, title: &str) -> Result<String> {
        let base = slugify(title);
        let mut candidate = base.clone();
        let mut suffix = 2;

        loop {
            let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE slug = ?")
                .bind(&candidate)
                .fetch_one(pool)
                .await
                .context("failed to check slug uniqueness")?;

            if taken == 0 {
                return Ok(candidate);
            }

            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
    }
}

/// Lowercase, hyphen-separated ASCII slug. Falls back to `post` when the
/// title has no usable characters.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        "post".to_string()
    } else {
        slug.to_string()
    }
}
