//! InkPress CMS Kernel
//!
//! HTTP server and plugin management commands.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use inkpress_kernel::config::Config;
use inkpress_kernel::plugin::{cli, lifecycle};
use inkpress_kernel::{app, db, plugins};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (the default).
    Serve,
    /// Manage plugin records.
    Plugin {
        #[command(subcommand)]
        action: PluginAction,
    },
}

#[derive(Subcommand, Debug)]
enum PluginAction {
    /// List registered plugins.
    List,
    /// Enable a plugin.
    Enable { name: String },
    /// Disable a plugin.
    Disable { name: String },
    /// Flip a plugin's enabled flag.
    Toggle { name: String },
    /// Remove a plugin record.
    Remove { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, pool).await,
        Command::Plugin { action } => run_plugin_command(&pool, action).await,
    }
}

async fn run_plugin_command(pool: &SqlitePool, action: PluginAction) -> Result<()> {
    match action {
        PluginAction::List => cli::cmd_plugin_list(pool).await,
        PluginAction::Enable { name } => cli::cmd_plugin_set_enabled(pool, &name, true).await,
        PluginAction::Disable { name } => cli::cmd_plugin_set_enabled(pool, &name, false).await,
        PluginAction::Toggle { name } => cli::cmd_plugin_toggle(pool, &name).await,
        PluginAction::Remove { name } => cli::cmd_plugin_remove(pool, &name).await,
    }
}

async fn serve(config: &Config, pool: SqlitePool) -> Result<()> {
    info!("Starting InkPress CMS kernel");
    info!(port = config.port, "Configuration loaded");

    let app = app::build(config, pool, plugins::builtin())
        .await
        .context("failed to build application")?;
    let registry = app.state.plugins_handle();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    lifecycle::teardown_all(&registry).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
