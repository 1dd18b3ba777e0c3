//! # CatchLog Common Library
//!
//! Shared code for the CatchLog service crates:
//! - Error and result types
//! - Root folder resolution and TOML bootstrap configuration
//! - Database initialization and the settings key-value table

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
