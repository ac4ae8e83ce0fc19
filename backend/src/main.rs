// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use backend::config::Config;
use backend::repository::{InMemoryRepository, QuizRepository, SqliteRepository};
use backend::routes;
use backend::service::QuizService;
use backend::state::AppState;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let state = if config.uses_memory_store() {
        tracing::warn!("Using in-memory storage, nothing will survive a restart");
        let store = Arc::new(InMemoryRepository::new());
        AppState::new(store.clone(), store, config.clone())
    } else {
        let store = Arc::new(connect_with_retry(&config.database_url).await);
        tracing::info!("Database connected, migrations applied.");
        AppState::new(store.clone(), store, config.clone())
    };

    let service = QuizService::new(state.repo.clone(), state.identity.clone());
    if let Err(e) = service.seed_admin(&config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let sessions = state.sessions.clone();
    let repo = state.repo.clone();

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", config.bind_addr, e));
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Shutting down, abandoning {} live session(s)", sessions.len());
    sessions.abandon_all().await;
    repo.close().await;
}

async fn connect_with_retry(url: &str) -> SqliteRepository {
    let mut retry_count = 0;
    loop {
        match SqliteRepository::connect(url).await {
            Ok(repo) => break repo,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open database after 5 retries: {}", e);
                }
                tracing::warn!(
                    "Database not ready, retrying in 2s... (Attempt {})",
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
