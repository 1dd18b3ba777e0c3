//! Errors shared by the CatchLog crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Storage and configuration failures
///
/// The service maps every variant to a 5xx response except `NotFound`,
/// which callers usually turn into a 404 themselves.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable TOML file or stored setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// No row for the given key
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
