//! Catch (post) records as stored and as returned by the API

use serde::{Deserialize, Serialize};

use super::AnalysisOutcome;

/// GPS position of a catch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub x_coord: f64,
    /// Longitude in degrees
    pub y_coord: f64,
}

impl Location {
    /// Build a location, requiring finite in-range coordinates
    pub fn new(x_coord: f64, y_coord: f64) -> Option<Self> {
        let valid = x_coord.is_finite()
            && y_coord.is_finite()
            && (-90.0..=90.0).contains(&x_coord)
            && (-180.0..=180.0).contains(&y_coord);
        valid.then_some(Self { x_coord, y_coord })
    }
}

/// User-supplied fields of a new catch
#[derive(Debug, Clone, Default)]
pub struct NewCatch {
    pub user_id: i64,
    pub caption: String,
    pub fish_weight: Option<String>,
    pub fish_species: Option<String>,
    pub location: Option<Location>,
}

/// A stored catch
#[derive(Debug, Clone, Serialize)]
pub struct Catch {
    pub post_id: i64,
    pub user_id: i64,
    pub caption: String,
    pub fish_weight: Option<String>,
    pub fish_species: Option<String>,
    pub image_path: String,
    pub date_created: String,
    pub location: Option<Location>,
    pub analysis: Option<AnalysisOutcome>,
}

/// One map pin
#[derive(Debug, Clone, Serialize)]
pub struct CatchLocation {
    pub post_id: i64,
    pub user_id: i64,
    pub x_coord: f64,
    pub y_coord: f64,
    pub caption: String,
    pub date_created: String,
}
