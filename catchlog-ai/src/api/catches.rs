//! Catch upload, feed and map endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::multipart::CatchForm;
use super::UserId;
use crate::db::catches;
use crate::models::{AnalysisOutcome, Catch, CatchLocation, Location, NewCatch};
use crate::services::render_analysis;
use crate::{ApiError, ApiResult, AppState};

/// Default page size for the feed
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Response for POST /upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: String,
    pub post_id: i64,
    pub image_path: String,
    pub analysis: Option<AnalysisOutcome>,
    pub analysis_html: String,
}

/// `{status, data}` envelope
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> DataResponse<T> {
    fn success(data: T) -> Json<Self> {
        Json(Self {
            status: "success",
            data,
        })
    }
}

/// A catch with its rendered analysis
#[derive(Debug, Serialize)]
pub struct CatchDetail {
    #[serde(flatten)]
    pub catch: Catch,
    pub analysis_html: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Location from the optional coordinate fields
///
/// Both coordinates are needed; one alone stores no location. Values that
/// are not numbers or are out of range are rejected.
fn parse_location(x_coord: Option<String>, y_coord: Option<String>) -> ApiResult<Option<Location>> {
    let (Some(x_coord), Some(y_coord)) = (x_coord, y_coord) else {
        return Ok(None);
    };

    let parse = |value: &str| {
        value
            .parse::<f64>()
            .map_err(|_| ApiError::BadRequest(format!("Invalid coordinate '{}'", value)))
    };
    let (x, y) = (parse(&x_coord)?, parse(&y_coord)?);

    Location::new(x, y).map(Some).ok_or_else(|| {
        ApiError::BadRequest(format!("Coordinates out of range: ({}, {})", x, y))
    })
}

/// POST /upload
///
/// **Request:** multipart `image` plus optional `caption`, `fish_weight`,
/// `fish_species`, `x_coord`, `y_coord`
///
/// **Errors:**
/// - 401 Unauthorized: no `x-user-id`
/// - 400 Bad Request: missing/invalid image or coordinates
/// - 413 Payload Too Large: image over 10 MiB
/// - 422 Unprocessable Entity: the photo is not a fish
pub async fn upload_catch(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    store_upload(&state, user_id, multipart).await.map(Json)
}

async fn store_upload(
    state: &AppState,
    user_id: i64,
    multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut form = CatchForm::read(multipart).await?;
    let image = form.take_image()?;

    let new_catch = NewCatch {
        user_id,
        caption: form.text("caption").unwrap_or_default(),
        fish_weight: form.text("fish_weight"),
        fish_species: form.text("fish_species"),
        location: parse_location(form.text("x_coord"), form.text("y_coord"))?,
    };

    let receipt = state.uploader.upload(new_catch, image).await?;
    let analysis_html = render_analysis(receipt.analysis.as_ref());

    Ok(UploadResponse {
        status: "success",
        message: "Upload successful".to_string(),
        post_id: receipt.post_id,
        image_path: receipt.image_path,
        analysis: receipt.analysis,
        analysis_html,
    })
}

/// GET /api/catches?limit&offset
pub async fn list_catches(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<DataResponse<Vec<Catch>>>> {
    let catches = catches::list_catches(&state.db, page.limit(), page.offset()).await?;
    Ok(DataResponse::success(catches))
}

async fn load_catch(state: &AppState, post_id: i64) -> ApiResult<Catch> {
    catches::get_catch(&state.db, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Catch {} not found", post_id)))
}

/// GET /api/catches/:id
pub async fn get_catch(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<DataResponse<CatchDetail>>> {
    let catch = load_catch(&state, post_id).await?;
    let analysis_html = render_analysis(catch.analysis.as_ref());
    Ok(DataResponse::success(CatchDetail {
        catch,
        analysis_html,
    }))
}

/// GET /api/catches/:id/analysis
pub async fn get_catch_analysis(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<Html<String>> {
    let catch = load_catch(&state, post_id).await?;
    Ok(Html(render_analysis(catch.analysis.as_ref())))
}

/// GET /api/locations
pub async fn list_locations(
    State(state): State<AppState>,
) -> ApiResult<Json<DataResponse<Vec<CatchLocation>>>> {
    let locations = catches::list_locations(&state.db).await?;
    info!(count = locations.len(), "Served catch locations");
    Ok(DataResponse::success(locations))
}

/// Build catch routes
pub fn catch_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_catch))
        .route("/api/catches", get(list_catches))
        .route("/api/catches/:id", get(get_catch))
        .route("/api/catches/:id/analysis", get(get_catch_analysis))
        .route("/api/locations", get(list_locations))
}
