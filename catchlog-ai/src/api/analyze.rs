//! Stand-alone photo analysis
//!
//! Runs the vision model and normalizer over a photo without storing it,
//! so a client can preview the identification before posting.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use super::multipart::CatchForm;
use crate::models::AnalysisOutcome;
use crate::services::render_analysis;
use crate::{ApiError, ApiResult, AppState};

/// Response for POST /api/analyze
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub analysis: Option<AnalysisOutcome>,
    pub analysis_html: String,
}

/// POST /api/analyze
///
/// **Request:** multipart `image`
///
/// **Errors:**
/// - 503 Service Unavailable: no analyzer configured, or the model failed
/// - 400 / 413: invalid or oversize image
pub async fn analyze_photo(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    if !state.uploader.has_analyzer().await {
        return Err(ApiError::ServiceUnavailable(
            "AI analysis is not configured".to_string(),
        ));
    }

    let mut form = CatchForm::read(multipart).await?;
    let image = form.take_image()?;

    let analysis = state.uploader.analyze_image(&image).await?;
    let analysis_html = render_analysis(analysis.as_ref());

    Ok(Json(AnalyzeResponse {
        status: "success",
        analysis,
        analysis_html,
    }))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/analyze", post(analyze_photo))
}
