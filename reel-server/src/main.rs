use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod handlers;
pub mod repository;
pub mod scheduler;
pub mod service;

use config::ServerConfig;
use service::notifier::JobNotifier;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reel_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Reel scheduling server...");

    let config = Arc::new(ServerConfig::from_env());
    config.validate().expect("Invalid configuration");

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // Local jobs interrupted by the previous process go back to the queue;
    // remote claims are left to the TTL reaper.
    service::job_service::requeue_interrupted(&pool)
        .await
        .expect("Failed to requeue interrupted jobs");

    let notifier = Arc::new(JobNotifier::new(config.notify_debounce));

    // Background loops: local workers, delayed promoter, reaper, sweeper
    let _scheduler_handles = scheduler::start(pool.clone(), Arc::clone(&notifier), Arc::clone(&config));

    let app = api::create_router(api::AppState {
        pool,
        notifier,
        config: Arc::clone(&config),
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
