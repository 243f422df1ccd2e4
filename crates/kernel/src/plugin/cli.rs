//! CLI command implementations for plugin management.
//!
//! These commands operate on plugin records only (database pool, no
//! server), so changes take effect on the next server start.

use anyhow::{Result, bail};
use sqlx::SqlitePool;

use super::record;

/// List all plugin records and their enabled flag.
pub async fn cmd_plugin_list(pool: &SqlitePool) -> Result<()> {
    let records = record::all(pool).await?;

    if records.is_empty() {
        println!("No plugins registered. Start the server once to register built-in plugins.");
        return Ok(());
    }

    println!("{:<24} {:<10} {:<12} {:<10}", "PLUGIN", "VERSION", "AUTHOR", "STATUS");
    println!("{}", "-".repeat(58));

    for r in &records {
        let status = if r.enabled { "enabled" } else { "disabled" };
        println!("{:<24} {:<10} {:<12} {:<10}", r.name, r.version, r.author, status);
    }

    Ok(())
}

/// Set a plugin's enabled flag (database only).
///
/// Prints a reminder that a running server must be restarted.
pub async fn cmd_plugin_set_enabled(pool: &SqlitePool, name: &str, enabled: bool) -> Result<()> {
    if !record::set_enabled(pool, name, enabled).await? {
        bail!("plugin '{name}' is not registered");
    }

    let verb = if enabled { "enabled" } else { "disabled" };
    println!("Plugin '{name}' {verb}.");
    println!("Note: if the server is running, restart it for CLI changes to take effect.");
    Ok(())
}

/// Flip a plugin's enabled flag (database only).
pub async fn cmd_plugin_toggle(pool: &SqlitePool, name: &str) -> Result<()> {
    let Some(enabled) = record::toggle(pool, name).await? else {
        bail!("plugin '{name}' is not registered");
    };

    let verb = if enabled { "enabled" } else { "disabled" };
    println!("Plugin '{name}' {verb}.");
    println!("Note: if the server is running, restart it for CLI changes to take effect.");
    Ok(())
}

/// Remove a plugin record. A plugin that is still compiled in is
/// registered again, with its defaults, on the next start.
pub async fn cmd_plugin_remove(pool: &SqlitePool, name: &str) -> Result<()> {
    if !record::soft_delete(pool, name).await? {
        bail!("plugin '{name}' is not registered");
    }

    println!("Plugin '{name}' removed.");
    Ok(())
}
