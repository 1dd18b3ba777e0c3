//! Catch (post) database operations
//!
//! Writes take a `SqliteConnection` so the upload pipeline can run them
//! inside one transaction; reads go straight to the pool.

use catchlog_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::warn;

use crate::models::{AnalysisOutcome, Catch, CatchLocation, Location, NewCatch};

const CATCH_COLUMNS: &str = r#"
    SELECT p.post_id, p.user_id, p.caption, p.fish_weight, p.fish_species,
           p.image_path, p.date_created, l.x_coord, l.y_coord, a.outcome_json
    FROM posts p
    LEFT JOIN location l ON l.post_id = p.post_id
    LEFT JOIN analyses a ON a.post_id = p.post_id
"#;

/// Insert a post row and return its id
///
/// The image path starts empty and is filled in by [`set_image_path`] once
/// the file has its final name.
pub async fn insert_post(
    conn: &mut SqliteConnection,
    catch: &NewCatch,
    date_created: &str,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (user_id, caption, fish_weight, fish_species, image_path, date_created)
        VALUES (?, ?, ?, ?, '', ?)
        "#,
    )
    .bind(catch.user_id)
    .bind(&catch.caption)
    .bind(&catch.fish_weight)
    .bind(&catch.fish_species)
    .bind(date_created)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Insert the location row for a post
pub async fn insert_location(
    conn: &mut SqliteConnection,
    post_id: i64,
    user_id: i64,
    location: &Location,
) -> Result<()> {
    sqlx::query("INSERT INTO location (user_id, post_id, x_coord, y_coord) VALUES (?, ?, ?, ?)")
        .bind(user_id)
        .bind(post_id)
        .bind(location.x_coord)
        .bind(location.y_coord)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Store the normalized analysis for a post
pub async fn insert_analysis(
    conn: &mut SqliteConnection,
    post_id: i64,
    outcome: &AnalysisOutcome,
    created_at: &str,
) -> Result<()> {
    let outcome_json = serde_json::to_string(outcome)
        .map_err(|e| Error::Internal(format!("Serialize analysis failed: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO analyses (post_id, outcome_json, is_fish, parse_error, species, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(post_id)
    .bind(outcome_json)
    .bind(outcome.is_fish())
    .bind(outcome.is_parse_error())
    .bind(outcome.species())
    .bind(created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn set_image_path(conn: &mut SqliteConnection, post_id: i64, image_path: &str) -> Result<()> {
    let result = sqlx::query("UPDATE posts SET image_path = ? WHERE post_id = ?")
        .bind(image_path)
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("post {}", post_id)));
    }
    Ok(())
}

fn catch_from_row(row: &SqliteRow) -> Catch {
    let post_id: i64 = row.get("post_id");

    let x_coord: Option<f64> = row.get("x_coord");
    let y_coord: Option<f64> = row.get("y_coord");
    let location = match (x_coord, y_coord) {
        (Some(x_coord), Some(y_coord)) => Some(Location { x_coord, y_coord }),
        _ => None,
    };

    let outcome_json: Option<String> = row.get("outcome_json");
    let analysis = outcome_json.and_then(|json| match AnalysisOutcome::from_stored_json(&json) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(post_id, error = %e, "Stored analysis is unreadable, ignoring");
            None
        }
    });

    Catch {
        post_id,
        user_id: row.get("user_id"),
        caption: row.get("caption"),
        fish_weight: row.get("fish_weight"),
        fish_species: row.get("fish_species"),
        image_path: row.get("image_path"),
        date_created: row.get("date_created"),
        location,
        analysis,
    }
}

/// Catches newest first
pub async fn list_catches(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Catch>> {
    let query = format!(
        "{} ORDER BY p.date_created DESC, p.post_id DESC LIMIT ? OFFSET ?",
        CATCH_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(catch_from_row).collect())
}

pub async fn get_catch(pool: &SqlitePool, post_id: i64) -> Result<Option<Catch>> {
    let query = format!("{} WHERE p.post_id = ?", CATCH_COLUMNS);
    let row = sqlx::query(&query)
        .bind(post_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(catch_from_row))
}

/// Every catch that has a location, for the map view
pub async fn list_locations(pool: &SqlitePool) -> Result<Vec<CatchLocation>> {
    let rows = sqlx::query(
        r#"
        SELECT p.post_id, p.user_id, l.x_coord, l.y_coord, p.caption, p.date_created
        FROM location l
        JOIN posts p ON p.post_id = l.post_id
        ORDER BY p.date_created DESC, p.post_id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| CatchLocation {
            post_id: row.get("post_id"),
            user_id: row.get("user_id"),
            x_coord: row.get("x_coord"),
            y_coord: row.get("y_coord"),
            caption: row.get("caption"),
            date_created: row.get("date_created"),
        })
        .collect())
}
