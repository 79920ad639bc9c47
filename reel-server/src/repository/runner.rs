//! Runner Repository
//!
//! Handles all database operations related to registered runners.

use chrono::Utc;
use reel_core::domain::runner::Runner;
use sqlx::SqlitePool;

use super::{datetime_to_millis, millis_to_datetime};

/// Create a runner entry for a successful registration
pub async fn create(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
    token: &str,
    registration_token_id: i64,
) -> Result<Runner, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO runners (name, description, token, registration_token_id,
                             last_contact, created_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(token)
    .bind(registration_token_id)
    .bind(datetime_to_millis(now))
    .execute(pool)
    .await?;

    Ok(Runner {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        description: description.map(str::to_string),
        token: token.to_string(),
        registration_token_id,
        last_contact: now,
        created_at: now,
    })
}

/// Find a runner by its secret token
pub async fn find_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Runner>, sqlx::Error> {
    let row = sqlx::query_as::<_, RunnerRow>(
        r#"
        SELECT id, name, description, token, registration_token_id, last_contact, created_at
        FROM runners
        WHERE token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Runner::from))
}

/// Find a runner by ID
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Runner>, sqlx::Error> {
    let row = sqlx::query_as::<_, RunnerRow>(
        r#"
        SELECT id, name, description, token, registration_token_id, last_contact, created_at
        FROM runners
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Runner::from))
}

/// List all runners, newest first
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Runner>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RunnerRow>(
        r#"
        SELECT id, name, description, token, registration_token_id, last_contact, created_at
        FROM runners
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Runner::from).collect())
}

/// Stamp the last time this runner talked to us
pub async fn update_last_contact(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE runners SET last_contact = $1 WHERE id = $2")
        .bind(datetime_to_millis(Utc::now()))
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a runner by ID
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM runners WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a runner by its secret token (unregister)
pub async fn delete_by_token(pool: &SqlitePool, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM runners WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunnerRow {
    id: i64,
    name: String,
    description: Option<String>,
    token: String,
    registration_token_id: i64,
    last_contact: i64,
    created_at: i64,
}

impl From<RunnerRow> for Runner {
    fn from(row: RunnerRow) -> Self {
        Runner {
            id: row.id,
            name: row.name,
            description: row.description,
            token: row.token,
            registration_token_id: row.registration_token_id,
            last_contact: millis_to_datetime(row.last_contact),
            created_at: millis_to_datetime(row.created_at),
        }
    }
}
