// src/repository/mod.rs

//! Storage contract consumed by the quiz core.
//!
//! The core never talks to a database directly: sessions append attempts and
//! aggregators list history through [`QuizRepository`]. Implementations must
//! make an appended attempt either fully visible or not visible at all, and
//! must never modify an attempt after it was appended.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    attempt::{Attempt, AttemptDraft, AttemptFilter},
    quiz::{Quiz, QuizDraft, QuizPatch},
    user::User,
};

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("repository is closed")]
    Closed,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => RepositoryError::Closed,
            other => RepositoryError::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Read/write access to quiz definitions and the attempt history.
/// No business rules live here.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// All quizzes in creation order.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, RepositoryError>;

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, RepositoryError>;

    /// Assigns the id and creation timestamp.
    async fn create_quiz(&self, draft: QuizDraft) -> Result<Quiz, RepositoryError>;

    async fn update_quiz(&self, id: &str, patch: QuizPatch) -> Result<Quiz, RepositoryError>;

    async fn delete_quiz(&self, id: &str) -> Result<(), RepositoryError>;

    /// Assigns the id and completion timestamp. Append-only.
    async fn append_attempt(&self, draft: AttemptDraft) -> Result<Attempt, RepositoryError>;

    /// Matching attempts in append order.
    async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>, RepositoryError>;

    /// Releases underlying resources. Later calls fail with `Closed`.
    async fn close(&self);
}

/// The identity provider: maps credentials to a stable user id and
/// user ids to display names.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, RepositoryError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// user id -> username for every known user.
    async fn usernames(&self) -> Result<HashMap<String, String>, RepositoryError>;
}

pub(crate) fn new_quiz_id() -> String {
    format!("quiz-{}", uuid::Uuid::new_v4())
}

pub(crate) fn new_attempt_id() -> String {
    format!("attempt-{}", uuid::Uuid::new_v4())
}

pub(crate) fn new_user_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
