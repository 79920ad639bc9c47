//! Registration Token Repository
//!
//! Handles all database operations related to runner registration tokens.

use chrono::Utc;
use reel_core::domain::runner::RunnerRegistrationToken;
use sqlx::SqlitePool;

use super::{datetime_to_millis, millis_to_datetime};

pub async fn create(
    pool: &SqlitePool,
    secret: &str,
) -> Result<RunnerRegistrationToken, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO runner_registration_tokens (secret, created_at) VALUES ($1, $2)",
    )
    .bind(secret)
    .bind(datetime_to_millis(now))
    .execute(pool)
    .await?;

    Ok(RunnerRegistrationToken {
        id: result.last_insert_rowid(),
        secret: secret.to_string(),
        created_at: now,
    })
}

pub async fn find_by_secret(
    pool: &SqlitePool,
    secret: &str,
) -> Result<Option<RunnerRegistrationToken>, sqlx::Error> {
    let row = sqlx::query_as::<_, RegistrationTokenRow>(
        "SELECT id, secret, created_at FROM runner_registration_tokens WHERE secret = $1",
    )
    .bind(secret)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(RunnerRegistrationToken::from))
}

/// List all registration tokens with the number of runners registered
/// through each
pub async fn list_with_counts(
    pool: &SqlitePool,
) -> Result<Vec<(RunnerRegistrationToken, i64)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RegistrationTokenCountRow>(
        r#"
        SELECT t.id, t.secret, t.created_at,
               (SELECT COUNT(*) FROM runners r WHERE r.registration_token_id = t.id)
                   AS registered_runners_count
        FROM runner_registration_tokens t
        ORDER BY t.created_at DESC, t.id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let count = row.registered_runners_count;
            (
                RunnerRegistrationToken {
                    id: row.id,
                    secret: row.secret,
                    created_at: millis_to_datetime(row.created_at),
                },
                count,
            )
        })
        .collect())
}

/// Delete a registration token; runners registered through it stay until
/// individually revoked
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM runner_registration_tokens WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RegistrationTokenRow {
    id: i64,
    secret: String,
    created_at: i64,
}

impl From<RegistrationTokenRow> for RunnerRegistrationToken {
    fn from(row: RegistrationTokenRow) -> Self {
        RunnerRegistrationToken {
            id: row.id,
            secret: row.secret,
            created_at: millis_to_datetime(row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct RegistrationTokenCountRow {
    id: i64,
    secret: String,
    created_at: i64,
    registered_runners_count: i64,
}
