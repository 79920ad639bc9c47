use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::time::Duration;

/// SQLite allows a single writer at a time; one pooled connection avoids
/// SQLITE_BUSY churn between the scheduler loops and the HTTP handlers.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Jobs table: the durable queue and the runner-claimable projection share
    // this single store.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            type TEXT NOT NULL,
            state TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            payload TEXT NOT NULL,
            private_payload TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            max_attempts INTEGER NOT NULL DEFAULT 1,
            failures INTEGER NOT NULL DEFAULT 0,
            parent_id INTEGER REFERENCES jobs(id),
            pending_children INTEGER NOT NULL DEFAULT 0,
            depends_on_id INTEGER REFERENCES jobs(id),
            runner_id INTEGER REFERENCES runners(id),
            processing_job_token TEXT,
            progress INTEGER,
            error TEXT,
            run_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            started_at INTEGER,
            finished_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Runners table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS runners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            token TEXT NOT NULL UNIQUE,
            registration_token_id INTEGER NOT NULL REFERENCES runner_registration_tokens(id),
            last_contact INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Registration tokens table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS runner_registration_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            secret TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Per-type pause flags, persisted so a pause survives restarts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS paused_job_types (
            type TEXT PRIMARY KEY,
            paused_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for the dequeue, availability and reaper scans
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_state_type ON jobs(state, type)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_parent_id ON jobs(parent_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_depends_on_id ON jobs(depends_on_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_updated_at ON jobs(updated_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runners_token ON runners(token)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");

    run_migrations(&pool).await.expect("failed to run migrations");

    pool
}
