//! Catch upload pipeline
//!
//! Temp image write, optional vision analysis, then one transaction for
//! the post, its location and its analysis. The image only gets its final
//! `{post_id}.{ext}` name inside that transaction, and any failure removes
//! whatever file exists at that point.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::image_store::{validate_image, ImageError, ImageStore, StoredImage, UploadedImage};
use super::response_normalizer::{NormalizeError, ResponseNormalizer};
use super::vision_analyzer::{VisionAnalyzer, VisionError};
use crate::db::catches;
use crate::models::{AnalysisOutcome, NewCatch};

/// Upload pipeline errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The vision model says the photo is not a fish
    #[error("{0}")]
    NotAFish(String),

    #[error("Vision analysis failed: {0}")]
    Analysis(#[from] VisionError),

    #[error("Database error: {0}")]
    Database(#[from] catchlog_common::Error),
}

impl From<sqlx::Error> for UploadError {
    fn from(err: sqlx::Error) -> Self {
        UploadError::Database(err.into())
    }
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub post_id: i64,
    /// Public URL path of the stored image
    pub image_path: String,
    pub analysis: Option<AnalysisOutcome>,
}

/// Stores catches and their analyses
///
/// Clones share the database pool and the analyzer slot, so an analyzer
/// installed through one clone (e.g. after the API key is configured) is
/// seen by all.
#[derive(Clone)]
pub struct CatchUploader {
    db: SqlitePool,
    images: ImageStore,
    analyzer: Arc<RwLock<Option<Arc<dyn VisionAnalyzer>>>>,
    normalizer: ResponseNormalizer,
}

impl CatchUploader {
    pub fn new(db: SqlitePool, images: ImageStore) -> Self {
        Self {
            db,
            images,
            analyzer: Arc::new(RwLock::new(None)),
            normalizer: ResponseNormalizer::new(),
        }
    }

    pub fn with_analyzer(self, analyzer: Arc<dyn VisionAnalyzer>) -> Self {
        Self {
            analyzer: Arc::new(RwLock::new(Some(analyzer))),
            ..self
        }
    }

    pub fn with_normalizer(mut self, normalizer: ResponseNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Install or replace the analyzer for all clones
    pub async fn set_analyzer(&self, analyzer: Arc<dyn VisionAnalyzer>) {
        *self.analyzer.write().await = Some(analyzer);
    }

    pub async fn has_analyzer(&self) -> bool {
        self.analyzer.read().await.is_some()
    }

    /// Run the analyzer and normalizer over image bytes
    ///
    /// `Ok(None)` means no analysis is available: no analyzer configured,
    /// or the model returned nothing.
    async fn run_analysis(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<Option<AnalysisOutcome>, VisionError> {
        let analyzer = self.analyzer.read().await.clone();
        let Some(analyzer) = analyzer else {
            return Ok(None);
        };

        let raw_text = analyzer.analyze(bytes, mime_type).await?;
        match self.normalizer.normalize(&raw_text) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(NormalizeError::MissingInput) => Ok(None),
        }
    }

    /// Analyze a photo without storing anything
    pub async fn analyze_image(
        &self,
        image: &UploadedImage,
    ) -> Result<Option<AnalysisOutcome>, UploadError> {
        let kind = validate_image(image)?;
        Ok(self.run_analysis(&image.bytes, &kind.mime_type).await?)
    }

    /// Store a new catch
    ///
    /// Analyzer failures do not block the upload; the catch is stored
    /// without an analysis. A not-fish verdict rejects it.
    pub async fn upload(
        &self,
        catch: NewCatch,
        image: UploadedImage,
    ) -> Result<UploadReceipt, UploadError> {
        let mut stored = self.images.store_temp(&image).await?;

        let analysis = match self.run_analysis(&image.bytes, stored.mime_type()).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "Vision analysis unavailable, storing catch without it");
                None
            }
        };

        if let Some(AnalysisOutcome::NotFish(result)) = &analysis {
            info!(reason = %result.reason, "Upload rejected: no fish detected");
            stored.discard().await;
            return Err(UploadError::NotAFish(result.reason.clone()));
        }

        match self.persist(&catch, &mut stored, analysis.as_ref()).await {
            Ok((post_id, image_path)) => {
                info!(
                    post_id,
                    user_id = catch.user_id,
                    image_path = %image_path,
                    analyzed = analysis.is_some(),
                    "Catch stored"
                );
                Ok(UploadReceipt {
                    post_id,
                    image_path,
                    analysis,
                })
            }
            Err(e) => {
                error!(error = %e, "Catch upload failed, rolling back");
                stored.discard().await;
                Err(e)
            }
        }
    }

    /// Insert rows and finalize the image in one transaction
    ///
    /// Returning early drops the transaction, which rolls it back.
    async fn persist(
        &self,
        catch: &NewCatch,
        stored: &mut StoredImage,
        analysis: Option<&AnalysisOutcome>,
    ) -> Result<(i64, String), UploadError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;

        let post_id = catches::insert_post(&mut tx, catch, &now).await?;

        if let Some(location) = &catch.location {
            catches::insert_location(&mut tx, post_id, catch.user_id, location).await?;
        }

        if let Some(outcome) = analysis {
            catches::insert_analysis(&mut tx, post_id, outcome, &now).await?;
        }

        let image_path = stored.finalize(post_id).await?;
        catches::set_image_path(&mut tx, post_id, &image_path).await?;

        tx.commit().await?;
        Ok((post_id, image_path))
    }
}
