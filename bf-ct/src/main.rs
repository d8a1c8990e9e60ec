//! bf-ct - Continuity Tracker microservice
//!
//! **Module Identity:**
//! - Name: bf-ct (Continuity Tracker)
//! - Default port: 5731
//!
//! Serves the story fact, timeline, issue and consistency check API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bf_common::api::{issue_session_token, load_session_secret};
use bf_common::config::BootstrapConfig;
use bf_common::time;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bf_ct::llm::{AnthropicClient, LanguageModel, UnconfiguredModel};
use bf_ct::{AppState, ServiceSettings};

/// Command-line arguments for bf-ct
#[derive(Parser, Debug)]
#[command(name = "bf-ct")]
#[command(about = "Continuity Tracker microservice for BookFactory")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "BOOKFACTORY_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long, env = "BOOKFACTORY_ROOT")]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a session token for local testing
    IssueToken {
        /// User id the token identifies
        #[arg(long)]
        user: String,

        /// Lifetime in hours
        #[arg(long, default_value = "24")]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = BootstrapConfig::load(args.config.as_deref()).context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting bf-ct (Continuity Tracker) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let db_path = config.database_path(args.root_folder.as_deref());
    info!("Database: {}", db_path.display());

    let db_pool = bf_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let session_secret = load_session_secret(&db_pool)
        .await
        .context("Failed to load session secret")?;

    if let Some(Command::IssueToken { user, ttl_hours }) = args.command {
        let expires_at = time::now_millis() + ttl_hours * 3_600_000;
        println!("{}", issue_session_token(&user, expires_at, session_secret));
        return Ok(());
    }

    let llm: Arc<dyn LanguageModel> = match config.resolve_api_key() {
        Some(key) => Arc::new(
            AnthropicClient::new(key, config.llm.model.clone())
                .context("Failed to create language model client")?,
        ),
        None => {
            warn!("No Anthropic API key configured; consistency checks will fail");
            Arc::new(UnconfiguredModel)
        }
    };
    info!("Language model: {}", llm.model_name());

    let settings = ServiceSettings {
        max_tokens: config.llm.max_tokens,
        unknown_method: config.resolution.unknown_method,
    };
    let state = AppState::new(db_pool, session_secret, llm, settings);
    let app = bf_ct::build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
