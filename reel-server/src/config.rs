//! Server configuration
//!
//! Defines all configurable parameters for the scheduling server including
//! claim TTLs, notification debounce, and storage locations.

use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
///
/// All timeouts and intervals are configurable to allow tuning
/// for different deployment scenarios (dev vs prod, fast vs slow runners).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Database connection string
    pub database_url: String,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// How long a claimed job may go without a heartbeat before the reaper
    /// requeues it
    pub stalled_job_ttl: Duration,

    /// Window in which "available jobs" pings to one runner are coalesced
    pub notify_debounce: Duration,

    /// Explicit runner `error()` reports a job survives before turning
    /// terminal
    pub runner_max_failures: u32,

    /// Local worker poll interval
    pub worker_tick: Duration,

    /// How long terminal jobs are kept before the sweeper deletes them
    pub job_retention: Duration,

    /// Root directory for job input/output files
    pub file_root: PathBuf,
}

impl ServerConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - REEL_DATABASE_URL (default: sqlite://reel.db?mode=rwc)
    /// - REEL_BIND_ADDR (default: 0.0.0.0:8080)
    /// - REEL_STALLED_JOB_TTL_SECS (default: 300)
    /// - REEL_NOTIFY_DEBOUNCE_MS (default: 500)
    /// - REEL_RUNNER_MAX_FAILURES (default: 5)
    /// - REEL_WORKER_TICK_MS (default: 1000)
    /// - REEL_JOB_RETENTION_DAYS (default: 7)
    /// - REEL_FILE_ROOT (default: ./data)
    pub fn from_env() -> ServerConfig {
        let database_url = std::env::var("REEL_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reel.db?mode=rwc".to_string());

        let bind_addr =
            std::env::var("REEL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let stalled_job_ttl = std::env::var("REEL_STALLED_JOB_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        let notify_debounce = std::env::var("REEL_NOTIFY_DEBOUNCE_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(500));

        let runner_max_failures = std::env::var("REEL_RUNNER_MAX_FAILURES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(5);

        let worker_tick = std::env::var("REEL_WORKER_TICK_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(1000));

        let job_retention = std::env::var("REEL_JOB_RETENTION_DAYS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|days| Duration::from_secs(days * 24 * 60 * 60))
            .unwrap_or(Duration::from_secs(7 * 24 * 60 * 60));

        let file_root = std::env::var("REEL_FILE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        ServerConfig {
            database_url,
            bind_addr,
            stalled_job_ttl,
            notify_debounce,
            runner_max_failures,
            worker_tick,
            job_retention,
            file_root,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("database_url cannot be empty");
        }

        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.stalled_job_ttl.is_zero() {
            anyhow::bail!("stalled_job_ttl must be greater than 0");
        }

        if self.runner_max_failures == 0 {
            anyhow::bail!("runner_max_failures must be greater than 0");
        }

        if self.worker_tick.is_zero() {
            anyhow::bail!("worker_tick must be greater than 0");
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            database_url: "sqlite://reel.db?mode=rwc".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            stalled_job_ttl: Duration::from_secs(300),
            notify_debounce: Duration::from_millis(500),
            runner_max_failures: 5,
            worker_tick: Duration::from_millis(1000),
            job_retention: Duration::from_secs(7 * 24 * 60 * 60),
            file_root: PathBuf::from("./data"),
        }
    }
}
