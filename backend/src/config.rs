// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

/// Seconds granted per question when a session starts.
pub const DEFAULT_SECONDS_PER_QUESTION: u64 = 30;

/// Maximum number of rows in the cross-quiz ("all") leaderboard.
pub const CROSS_QUIZ_LEADERBOARD_LIMIT: usize = 20;

/// Question prompts longer than this are shortened in analytics output.
pub const QUESTION_PREVIEW_CHARS: usize = 50;

/// Number of recent attempts shown per quiz in analytics.
pub const RECENT_ATTEMPTS_LIMIT: usize = 5;

/// How long a finished session stays readable before the registry drops it.
pub const FINISHED_SESSION_TTL_SECS: u64 = 600;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

/// Special `DATABASE_URL` value that selects the in-memory repository.
pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub seconds_per_question: u64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://quizforge.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = parse_or("JWT_EXPIRATION", 86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let seconds_per_question = parse_or("SECONDS_PER_QUESTION", DEFAULT_SECONDS_PER_QUESTION);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            seconds_per_question,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }

    /// Configuration for tests and embedded use: in-memory storage, default timing.
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            database_url: MEMORY_DATABASE_URL.to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            seconds_per_question: DEFAULT_SECONDS_PER_QUESTION,
            admin_username: None,
            admin_password: None,
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
