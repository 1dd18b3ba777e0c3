//! Settings database operations
//!
//! Typed accessors over the shared key-value `settings` table.

use catchlog_common::db::settings::{get_setting, set_setting};
use catchlog_common::Result;
use sqlx::{Pool, Sqlite};

/// Settings key for the Gemini API key
pub const GEMINI_API_KEY: &str = "gemini_api_key";

/// Get Gemini API key from database
///
/// **Returns:** Some(key) if set, None otherwise
pub async fn get_gemini_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, GEMINI_API_KEY).await
}

/// Set Gemini API key in database
pub async fn set_gemini_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, GEMINI_API_KEY, key).await
}
