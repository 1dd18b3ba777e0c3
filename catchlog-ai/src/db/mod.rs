//! Database access for catchlog-ai
//!
//! Schema creation lives in `catchlog_common::db`; this module holds the
//! queries the service runs against it.

pub mod catches;
pub mod settings;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (creating if needed) the catch database and its tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());

    let pool = catchlog_common::db::init_database(db_path).await?;
    Ok(pool)
}
