//! HTTP API handlers for catchlog-ai

pub mod analyze;
pub mod catches;
pub mod health;
pub mod multipart;
pub mod settings;
pub mod user;

pub use analyze::analyze_routes;
pub use catches::catch_routes;
pub use health::health_routes;
pub use settings::settings_routes;
pub use user::UserId;
