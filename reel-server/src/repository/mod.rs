//! Repository Module
//!
//! Database access layer. Each submodule owns the SQL for one entity.

pub mod job;
pub mod registration_token;
pub mod runner;

// Re-export for convenience
pub use job as job_repository;
pub use registration_token as registration_token_repository;
pub use runner as runner_repository;

use chrono::{DateTime, Utc};

// Timestamps are persisted as unix milliseconds so range scans compare as
// plain integers.

pub(crate) fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

pub(crate) fn datetime_to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}
