mod config;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use denuncias_api::storage::ImageStore;
use denuncias_api::token::TokenIssuer;
use denuncias_api::{AppState, AppStateInner};
use denuncias_db::Database;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "denuncias", version, about = "Citizen complaints backend")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or upgrade the database schema, then exit.
    Migrate,
    /// Serve the HTTP API (default). Requires a migrated database.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "denuncias_server=debug,denuncias_api=debug,denuncias_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd.unwrap_or(Command::Serve) {
        Command::Migrate => migrate(),
        Command::Serve => serve(Config::from_env()?).await,
    }
}

fn migrate() -> anyhow::Result<()> {
    let db_path = Config::db_path_from_env();
    let db = Database::open(&db_path)?;
    let version = db.migrate()?;
    info!("Database {} is at schema v{}", db_path.display(), version);
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let db = Database::open(&config.db_path)?;
    db.ensure_migrated()?;

    let images = ImageStore::new(config.upload_dir.clone()).await?;
    let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl);

    let state: AppState = Arc::new(AppStateInner { db, images, tokens });

    let app = with_layers(denuncias_api::router(state), &config);

    info!("Complaints API listening on {}", config.addr);
    info!(
        "Uploads in {}, tokens valid for {} minutes",
        config.upload_dir.display(),
        config.token_ttl.num_minutes()
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Boundary layers: body limit, request timeout (408), CORS, tracing.
fn with_layers(app: Router, config: &Config) -> Router {
    app.layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        let sigterm = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}
