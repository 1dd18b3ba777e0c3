//! Data models for catchlog-ai
//!
//! - Normalized vision-model analysis records
//! - Catch (post) records and map locations

pub mod catch;
pub mod fish_analysis;

pub use catch::{Catch, CatchLocation, Location, NewCatch};
pub use fish_analysis::{AnalysisOutcome, Confidence, FishAnalysis, NotFishResult, Regulations};
