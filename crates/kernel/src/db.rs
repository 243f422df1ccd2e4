//! Database connection pool management.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::Config;

/// Create a SQLite connection pool.
///
/// In-memory databases exist only as long as their connection, so a
/// `:memory:` URL gets a single connection that is never recycled.
pub async fn create_pool(config: &Config) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("invalid DATABASE_URL")?
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    let connected = if is_in_memory(&config.database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_with(options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal))
            .await
    };

    connected.context("failed to connect to SQLite")
}

/// Apply pending schema migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    Ok(())
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &SqlitePool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Current time as unix seconds, the timestamp format of every table.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Fresh, migrated in-memory database for unit tests.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        ..Config::default()
    };
    #[allow(clippy::expect_used)]
    let pool = create_pool(&config).await.expect("in-memory pool");
    #[allow(clippy::expect_used)]
    run_migrations(&pool).await.expect("migrations");
    pool
}
