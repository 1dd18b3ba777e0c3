//! In-process app for router tests
//!
//! An in-memory database, a temporary image folder and an optional canned
//! vision analyzer, wired the same way `main` wires the real ones.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use catchlog_ai::services::{CatchUploader, ImageStore, VisionAnalyzer, VisionError};
use catchlog_ai::{build_router, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// PNG signature, enough to pass content sniffing
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n";

const BOUNDARY: &str = "catchlog-test-boundary";

/// Vision analyzer returning fixed text, or a network error
pub struct CannedAnalyzer {
    response: Option<String>,
}

impl CannedAnalyzer {
    pub fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Some(text.to_string()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { response: None })
    }
}

#[async_trait]
impl VisionAnalyzer for CannedAnalyzer {
    async fn analyze(&self, _image: &[u8], _mime_type: &str) -> Result<String, VisionError> {
        self.response
            .clone()
            .ok_or_else(|| VisionError::Network("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub state: AppState,
    dir: TempDir,
}

impl TestApp {
    /// App without a vision analyzer
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_analyzer(analyzer: Arc<dyn VisionAnalyzer>) -> Self {
        Self::build(Some(analyzer)).await
    }

    async fn build(analyzer: Option<Arc<dyn VisionAnalyzer>>) -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        catchlog_common::db::create_schema(&pool).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::new(dir.path().join("user_images"));
        let mut uploader = CatchUploader::new(pool.clone(), images);
        if let Some(analyzer) = analyzer {
            uploader = uploader.with_analyzer(analyzer);
        }

        let state = AppState::new(pool.clone(), uploader)
            .with_config_path(Some(dir.path().join("config").join("catchlog.toml")));

        Self { pool, state, dir }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config").join("catchlog.toml")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dir.path().join("user_images")
    }

    /// Names of the files currently in the image folder
    pub fn image_files(&self) -> Vec<String> {
        match std::fs::read_dir(self.images_dir()) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

/// One multipart form part
pub enum Part {
    Text(&'static str, String),
    File {
        name: &'static str,
        file_name: &'static str,
        content_type: &'static str,
        bytes: Vec<u8>,
    },
}

impl Part {
    pub fn text(name: &'static str, value: &str) -> Self {
        Part::Text(name, value.to_string())
    }

    pub fn png() -> Self {
        Part::File {
            name: "image",
            file_name: "catch.png",
            content_type: "image/png",
            bytes: PNG_BYTES.to_vec(),
        }
    }
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// POST a multipart form, optionally as a logged-in user
pub fn multipart_request(uri: &str, user_id: Option<i64>, parts: &[Part]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id.to_string());
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub async fn text_body(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&text_body(response).await).unwrap()
}
