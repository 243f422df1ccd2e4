//! Persisted plugin records.
//!
//! One row per plugin name in the `plugin` table tracks the enabled flag and
//! the settings blob (a JSON object of string to string). Rows are never
//! hard-deleted; `deleted_at` marks a soft removal, and soft-removed rows are
//! invisible to every lookup here.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use super::PluginSettings;
use crate::db;

/// A live row from the `plugin` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PluginRecord {
    pub id: i64,
    pub name: String,
    pub author: String,
    pub version: String,
    pub enabled: bool,
    pub settings: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Values for a first-seen plugin.
#[derive(Debug)]
pub struct NewPluginRecord<'a> {
    pub name: &'a str,
    pub author: &'a str,
    pub version: &'a str,
    pub enabled: bool,
    pub settings: String,
}

impl PluginRecord {
    /// Decode this record's settings blob, filling in missing defaults.
    pub fn decoded_settings(&self, defaults: &PluginSettings) -> PluginSettings {
        decode_settings(&self.name, &self.settings, defaults)
    }
}

/// Find the live record for a plugin.
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<PluginRecord>> {
    let record = sqlx::query_as::<_, PluginRecord>(
        "SELECT * FROM plugin WHERE name = ? AND deleted_at IS NULL",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
    .context("failed to fetch plugin record")?;

    Ok(record)
}

/// All live records, ordered by name.
pub async fn all(pool: &SqlitePool) -> Result<Vec<PluginRecord>> {
    let records = sqlx::query_as::<_, PluginRecord>(
        "SELECT * FROM plugin WHERE deleted_at IS NULL ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .context("failed to list plugin records")?;

    Ok(records)
}

/// Number of live records with the enabled flag set.
pub async fn count_enabled(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM plugin WHERE enabled = 1 AND deleted_at IS NULL",
    )
    .fetch_one(pool)
    .await
    .context("failed to count enabled plugins")?;

    Ok(count)
}

/// Insert the record for a first-seen plugin.
///
/// The `UNIQUE` constraint on `name` settles concurrent first boots: the
/// loser's insert becomes a no-op. A soft-deleted row is revived with the
/// supplied values. Returns `true` if a row was written.
pub async fn register(pool: &SqlitePool, new: &NewPluginRecord<'_>) -> Result<bool> {
    let now = db::now();

    let result = sqlx::query(
        r#"
        INSERT INTO plugin (name, author, version, enabled, settings, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (name) DO UPDATE SET
            author = excluded.author,
            version = excluded.version,
            enabled = excluded.enabled,
            settings = excluded.settings,
            updated_at = excluded.updated_at,
            deleted_at = NULL
        WHERE plugin.deleted_at IS NOT NULL
        "#,
    )
    .bind(new.name)
    .bind(new.author)
    .bind(new.version)
    .bind(new.enabled)
    .bind(&new.settings)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("failed to insert plugin record")?;

    Ok(result.rows_affected() > 0)
}

/// Whether the live record exists and is enabled. Missing means disabled.
pub async fn is_enabled(pool: &SqlitePool, name: &str) -> Result<bool> {
    let enabled: Option<bool> =
        sqlx::query_scalar("SELECT enabled FROM plugin WHERE name = ? AND deleted_at IS NULL")
            .bind(name)
            .fetch_optional(pool)
            .await
            .context("failed to read plugin enabled flag")?;

    Ok(enabled.unwrap_or(false))
}

/// Flip the enabled flag in a single statement.
///
/// Returns the new value, or `None` if no live record exists.
pub async fn toggle(pool: &SqlitePool, name: &str) -> Result<Option<bool>> {
    let enabled = sqlx::query_scalar::<_, bool>(
        r#"
        UPDATE plugin SET enabled = NOT enabled, updated_at = ?
        WHERE name = ? AND deleted_at IS NULL
        RETURNING enabled
        "#,
    )
    .bind(db::now())
    .bind(name)
    .fetch_optional(pool)
    .await
    .context("failed to toggle plugin")?;

    Ok(enabled)
}

/// Set the enabled flag explicitly. Returns `false` if no live record exists.
pub async fn set_enabled(pool: &SqlitePool, name: &str, enabled: bool) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE plugin SET enabled = ?, updated_at = ? WHERE name = ? AND deleted_at IS NULL",
    )
    .bind(enabled)
    .bind(db::now())
    .bind(name)
    .execute(pool)
    .await
    .context("failed to set plugin enabled flag")?;

    Ok(result.rows_affected() > 0)
}

/// Read a plugin's settings with missing defaults filled in.
///
/// Returns `None` if no live record exists.
pub async fn load_settings(
    pool: &SqlitePool,
    name: &str,
    defaults: &PluginSettings,
) -> Result<Option<PluginSettings>> {
    let record = find_by_name(pool, name).await?;
    Ok(record.map(|r| r.decoded_settings(defaults)))
}

/// Replace the settings blob wholesale. Returns `false` if no live record
/// exists.
pub async fn update_settings(
    pool: &SqlitePool,
    name: &str,
    settings: &PluginSettings,
) -> Result<bool> {
    let blob = serde_json::to_string(settings).context("failed to encode plugin settings")?;

    let result = sqlx::query(
        "UPDATE plugin SET settings = ?, updated_at = ? WHERE name = ? AND deleted_at IS NULL",
    )
    .bind(&blob)
    .bind(db::now())
    .bind(name)
    .execute(pool)
    .await
    .context("failed to update plugin settings")?;

    Ok(result.rows_affected() > 0)
}

/// Mark a record as removed. Returns `false` if no live record exists.
pub async fn soft_delete(pool: &SqlitePool, name: &str) -> Result<bool> {
    let now = db::now();

    let result = sqlx::query(
        "UPDATE plugin SET deleted_at = ?, updated_at = ? WHERE name = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(name)
    .execute(pool)
    .await
    .context("failed to remove plugin record")?;

    Ok(result.rows_affected() > 0)
}

/// Decode a settings blob and fill in keys the blob lacks from `defaults`.
///
/// A blob that is not a JSON object of strings yields the defaults.
pub fn decode_settings(name: &str, blob: &str, defaults: &PluginSettings) -> PluginSettings {
    let mut settings = match serde_json::from_str::<PluginSettings>(blob) {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(plugin = %name, error = %e, "corrupt settings blob, using defaults");
            return defaults.clone();
        }
    };

    for (key, value) in defaults {
        settings
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }

    settings
}
