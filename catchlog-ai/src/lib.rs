//! catchlog-ai library interface
//!
//! Fish-catch uploads with AI species identification. Exposes the router
//! and its state for the binary and for integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::ServerFailure;
use crate::services::{CatchUploader, MAX_IMAGE_BYTES};

/// Request body ceiling: one maximum-size image plus form overhead
const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES + 2 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Upload pipeline, including the optional vision analyzer
    pub uploader: CatchUploader,
    /// TOML file that API-configured settings are mirrored to
    pub config_path: Option<PathBuf>,
    /// Gemini model for clients created at runtime
    pub gemini_model: Option<String>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, uploader: CatchUploader) -> Self {
        Self {
            db,
            uploader,
            config_path: None,
            gemini_model: None,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_config_path(mut self, config_path: Option<PathBuf>) -> Self {
        self.config_path = config_path;
        self
    }

    pub fn with_gemini_model(mut self, model: Option<String>) -> Self {
        self.gemini_model = model;
        self
    }

}

/// Remember the latest server-side failure of any handler for /health
async fn track_failures(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if let Some(ServerFailure(message)) = response.extensions().get::<ServerFailure>() {
        *state.last_error.write().await = Some(message.clone());
    }
    response
}

/// Build application router
///
/// Stored photos are served from the uploader's image folder under
/// `/user_images`.
pub fn build_router(state: AppState) -> Router {
    let images = ServeDir::new(state.uploader.images().dir());

    Router::new()
        .merge(api::health_routes())
        .merge(api::catch_routes())
        .merge(api::analyze_routes())
        .merge(api::settings_routes())
        .nest_service(services::image_store::PUBLIC_PREFIX, images)
        .layer(middleware::from_fn_with_state(state.clone(), track_failures))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
