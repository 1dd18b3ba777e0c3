//! catchlog-ai - fish catch log service
//!
//! Accepts catch photos, identifies the species with a vision model and
//! serves the catch feed and map data.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catchlog_ai::services::{CatchUploader, GeminiClient, ImageStore};
use catchlog_ai::AppState;
use catchlog_common::config::{
    default_config_path, load_default_toml_config, RootFolderInitializer, RootFolderResolver,
};

/// Command-line arguments for catchlog-ai
#[derive(Parser, Debug)]
#[command(name = "catchlog-ai")]
#[command(about = "Fish catch log with AI species identification")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "CATCHLOG_PORT")]
    port: u16,

    /// Root folder holding the database and uploaded images
    #[arg(short, long, env = "CATCHLOG_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: IpAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_default_toml_config();

    // RUST_LOG wins over the TOML level
    let level = &toml_config.logging.level;
    let default_filter = format!(
        "catchlog_ai={level},catchlog_common={level},tower_http={level}"
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting catchlog-ai v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build: {} ({})",
        env!("GIT_HASH"),
        env!("BUILD_PROFILE")
    );

    // Step 1: Resolve and create the root folder
    let root_folder = RootFolderResolver::new("catchlog")
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", initializer.root_folder().display());

    // Step 2: Open or create the database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = catchlog_ai::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    // Step 3: Vision analyzer, when a key is configured
    let images = ImageStore::new(initializer.images_path());
    let mut uploader = CatchUploader::new(db_pool.clone(), images);

    let api_key = catchlog_ai::config::resolve_gemini_api_key(&db_pool, &toml_config).await?;
    if let Some(key) = api_key {
        match GeminiClient::new(key, toml_config.gemini_model.clone()) {
            Ok(client) => {
                info!("AI analysis enabled (model: {})", client.model());
                uploader = uploader.with_analyzer(Arc::new(client));
            }
            Err(e) => warn!("AI analysis disabled, Gemini client setup failed: {}", e),
        }
    }

    let state = AppState::new(db_pool, uploader)
        .with_config_path(default_config_path())
        .with_gemini_model(toml_config.gemini_model.clone());
    let app = catchlog_ai::build_router(state);

    // Step 4: Serve
    let addr = SocketAddr::new(args.bind, args.port);
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
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
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
