// src/repository/memory.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    IdentityStore, QuizRepository, RepositoryError, new_attempt_id, new_quiz_id, new_user_id,
};
use crate::models::{
    attempt::{Attempt, AttemptDraft, AttemptFilter},
    quiz::{Quiz, QuizDraft, QuizPatch},
    user::User,
};

/// Process-local store. Every write happens under one write lock, so an
/// appended attempt is visible to readers either completely or not at all.
#[derive(Default)]
pub struct InMemoryRepository {
    quizzes: RwLock<Vec<Quiz>>,
    attempts: RwLock<Vec<Attempt>>,
    users: RwLock<Vec<User>>,
    closed: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), RepositoryError> {
        if self.closed.load(Ordering::Acquire) {
            Err(RepositoryError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, RepositoryError> {
        self.ensure_open()?;
        Ok(self.quizzes.read().await.clone())
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, RepositoryError> {
        self.ensure_open()?;
        Ok(self.quizzes.read().await.iter().find(|q| q.id == id).cloned())
    }

    async fn create_quiz(&self, draft: QuizDraft) -> Result<Quiz, RepositoryError> {
        self.ensure_open()?;
        let quiz = Quiz {
            id: new_quiz_id(),
            title: draft.title,
            description: draft.description,
            creator_id: draft.creator_id,
            created_at: Utc::now(),
            questions: draft.questions,
            is_published: draft.is_published,
        };
        self.quizzes.write().await.push(quiz.clone());
        Ok(quiz)
    }

    async fn update_quiz(&self, id: &str, patch: QuizPatch) -> Result<Quiz, RepositoryError> {
        self.ensure_open()?;
        let mut quizzes = self.quizzes.write().await;
        let quiz = quizzes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Quiz {}", id)))?;
        patch.apply_to(quiz);
        Ok(quiz.clone())
    }

    async fn delete_quiz(&self, id: &str) -> Result<(), RepositoryError> {
        self.ensure_open()?;
        let mut quizzes = self.quizzes.write().await;
        let before = quizzes.len();
        quizzes.retain(|q| q.id != id);
        if quizzes.len() == before {
            return Err(RepositoryError::NotFound(format!("Quiz {}", id)));
        }
        Ok(())
    }

    async fn append_attempt(&self, draft: AttemptDraft) -> Result<Attempt, RepositoryError> {
        self.ensure_open()?;
        let attempt = Attempt {
            id: new_attempt_id(),
            quiz_id: draft.quiz_id,
            user_id: draft.user_id,
            score: draft.score,
            max_score: draft.max_score,
            completed_at: Utc::now(),
            answers: draft.answers,
        };
        self.attempts.write().await.push(attempt.clone());
        Ok(attempt)
    }

    async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>, RepositoryError> {
        self.ensure_open()?;
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[async_trait]
impl IdentityStore for InMemoryRepository {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, RepositoryError> {
        self.ensure_open()?;
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == username) {
            return Err(RepositoryError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }
        let user = User {
            id: new_user_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            role: role.to_string(),
            created_at: Some(Utc::now()),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.ensure_open()?;
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn usernames(&self) -> Result<HashMap<String, String>, RepositoryError> {
        self.ensure_open()?;
        Ok(self
            .users
            .read()
            .await
            .iter()
            .map(|u| (u.id.clone(), u.username.clone()))
            .collect())
    }
}
