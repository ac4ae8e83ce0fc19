// src/repository/sqlite.rs

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    types::Json,
};

use super::{
    IdentityStore, QuizRepository, RepositoryError, new_attempt_id, new_quiz_id, new_user_id,
};
use crate::models::{
    attempt::{AnswerRecord, Attempt, AttemptDraft, AttemptFilter},
    quiz::{Question, Quiz, QuizDraft, QuizPatch},
    user::User,
};

/// Row shape of the 'quizzes' table. Questions are stored as a JSON array.
#[derive(FromRow)]
struct QuizRow {
    id: String,
    title: String,
    description: String,
    creator_id: String,
    created_at: DateTime<Utc>,
    questions: Json<Vec<Question>>,
    is_published: bool,
}

impl From<QuizRow> for Quiz {
    fn from(row: QuizRow) -> Self {
        Quiz {
            id: row.id,
            title: row.title,
            description: row.description,
            creator_id: row.creator_id,
            created_at: row.created_at,
            questions: row.questions.0,
            is_published: row.is_published,
        }
    }
}

/// Row shape of the 'attempts' table. Answers are stored as a JSON array.
#[derive(FromRow)]
struct AttemptRow {
    id: String,
    quiz_id: String,
    user_id: String,
    score: i64,
    max_score: i64,
    completed_at: DateTime<Utc>,
    answers: Json<Vec<AnswerRecord>>,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = RepositoryError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let to_u32 = |v: i64| {
            u32::try_from(v)
                .map_err(|_| RepositoryError::Serialization(format!("score out of range: {}", v)))
        };
        Ok(Attempt {
            score: to_u32(row.score)?,
            max_score: to_u32(row.max_score)?,
            id: row.id,
            quiz_id: row.quiz_id,
            user_id: row.user_id,
            completed_at: row.completed_at,
            answers: row.answers.0,
        })
    }
}

const QUIZ_COLUMNS: &str =
    "id, title, description, creator_id, created_at, questions, is_published";

const ATTEMPT_COLUMNS: &str =
    "id, quiz_id, user_id, score, max_score, completed_at, answers";

/// SQLite-backed repository. Each attempt is written by a single INSERT,
/// which SQLite applies atomically.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens the database at `url`, creating it if needed, and runs migrations.
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        // Every connection to `sqlite::memory:` is a separate database, so the
        // pool must hold exactly one and never recycle it.
        let in_memory = url.contains(":memory:");
        let max_connections = if in_memory { 1 } else { 5 };

        let options: SqliteConnectOptions = url
            .parse::<SqliteConnectOptions>()?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout((!in_memory).then(|| Duration::from_secs(600)))
            .max_lifetime((!in_memory).then(|| Duration::from_secs(1800)))
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        tracing::info!("Migrations applied successfully.");
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for SqliteRepository {
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, RepositoryError> {
        let rows = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {} FROM quizzes ORDER BY created_at ASC, rowid ASC",
            QUIZ_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, RepositoryError> {
        let row = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {} FROM quizzes WHERE id = $1",
            QUIZ_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Quiz::from))
    }

    async fn create_quiz(&self, draft: QuizDraft) -> Result<Quiz, RepositoryError> {
        let quiz = Quiz {
            id: new_quiz_id(),
            title: draft.title,
            description: draft.description,
            creator_id: draft.creator_id,
            created_at: Utc::now(),
            questions: draft.questions,
            is_published: draft.is_published,
        };

        sqlx::query(
            r#"
            INSERT INTO quizzes (id, title, description, creator_id, created_at, questions, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&quiz.id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(&quiz.creator_id)
        .bind(quiz.created_at)
        .bind(Json(&quiz.questions))
        .bind(quiz.is_published)
        .execute(&self.pool)
        .await?;

        Ok(quiz)
    }

    async fn update_quiz(&self, id: &str, patch: QuizPatch) -> Result<Quiz, RepositoryError> {
        let mut quiz = self
            .get_quiz(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Quiz {}", id)))?;
        patch.apply_to(&mut quiz);

        let result = sqlx::query(
            r#"
            UPDATE quizzes
            SET title = $1, description = $2, questions = $3, is_published = $4
            WHERE id = $5
            "#,
        )
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(Json(&quiz.questions))
        .bind(quiz.is_published)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Quiz {}", id)));
        }
        Ok(quiz)
    }

    async fn delete_quiz(&self, id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Quiz {}", id)));
        }
        Ok(())
    }

    async fn append_attempt(&self, draft: AttemptDraft) -> Result<Attempt, RepositoryError> {
        let attempt = Attempt {
            id: new_attempt_id(),
            quiz_id: draft.quiz_id,
            user_id: draft.user_id,
            score: draft.score,
            max_score: draft.max_score,
            completed_at: Utc::now(),
            answers: draft.answers,
        };

        sqlx::query(
            r#"
            INSERT INTO attempts (id, quiz_id, user_id, score, max_score, completed_at, answers)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&attempt.id)
        .bind(&attempt.quiz_id)
        .bind(&attempt.user_id)
        .bind(i64::from(attempt.score))
        .bind(i64::from(attempt.max_score))
        .bind(attempt.completed_at)
        .bind(Json(&attempt.answers))
        .execute(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn list_attempts(&self, filter: AttemptFilter) -> Result<Vec<Attempt>, RepositoryError> {
        let rows = match &filter {
            AttemptFilter::All => {
                sqlx::query_as::<_, AttemptRow>(&format!(
                    "SELECT {} FROM attempts ORDER BY rowid ASC",
                    ATTEMPT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
            AttemptFilter::ByUser(user_id) => {
                sqlx::query_as::<_, AttemptRow>(&format!(
                    "SELECT {} FROM attempts WHERE user_id = $1 ORDER BY rowid ASC",
                    ATTEMPT_COLUMNS
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            AttemptFilter::ByQuiz(quiz_id) => {
                sqlx::query_as::<_, AttemptRow>(&format!(
                    "SELECT {} FROM attempts WHERE quiz_id = $1 ORDER BY rowid ASC",
                    ATTEMPT_COLUMNS
                ))
                .bind(quiz_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Attempt::try_from).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl IdentityStore for SqliteRepository {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, RepositoryError> {
        let user = User {
            id: new_user_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            role: role.to_string(),
            created_at: Some(Utc::now()),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                RepositoryError::Conflict(format!("Username '{}' already exists", username))
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                RepositoryError::from(e)
            }
        })?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn usernames(&self) -> Result<HashMap<String, String>, RepositoryError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT id, username FROM users")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }
}
