// src/service.rs

//! Application operations behind the HTTP handlers.
//!
//! Handlers deal with extraction and status codes; everything that touches
//! the repository or applies an authoring rule goes through [`QuizService`].

use std::sync::Arc;

use serde::Serialize;

use crate::{
    analytics::{self, AnalyticsError},
    config::Config,
    error::AppError,
    leaderboard,
    models::{
        analytics::AnalyticsSnapshot,
        attempt::{Attempt, AttemptFilter},
        leaderboard::{Leaderboard, LeaderboardScope},
        quiz::{
            CreateQuizRequest, Quiz, QuizDraft, QuizPatch, UpdateQuizRequest, build_questions,
            check_questions,
        },
        user::{ROLE_ADMIN, ROLE_EXAMINER, ROLE_USER, User},
    },
    repository::{IdentityStore, QuizRepository, RepositoryError},
    utils::{hash::hash_password, html::clean_html, jwt::Claims},
};

/// Result of a read-only aggregation.
///
/// When the history could not be read, `value` is the empty default and
/// `error` says why. An empty board with no error means there is no data.
#[derive(Debug, Serialize)]
pub struct Aggregated<T> {
    #[serde(flatten)]
    pub value: T,
    pub error: Option<String>,
}

impl<T> Aggregated<T> {
    fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    fn unavailable(value: T, err: RepositoryError) -> Self {
        tracing::warn!("Aggregation unavailable: {}", err);
        Self {
            value,
            error: Some(err.to_string()),
        }
    }

    /// Turns a flagged result into `AppError::AggregationUnavailable`.
    pub fn into_result(self) -> Result<T, AppError> {
        match self.error {
            Some(err) => Err(AppError::AggregationUnavailable(err)),
            None => Ok(self.value),
        }
    }
}

#[derive(Clone)]
pub struct QuizService {
    repo: Arc<dyn QuizRepository>,
    identity: Arc<dyn IdentityStore>,
}

impl QuizService {
    pub fn new(repo: Arc<dyn QuizRepository>, identity: Arc<dyn IdentityStore>) -> Self {
        Self { repo, identity }
    }

    pub async fn list_published(&self, search: Option<&str>) -> Result<Vec<Quiz>, AppError> {
        let query = search.unwrap_or("");
        Ok(self
            .repo
            .list_quizzes()
            .await?
            .into_iter()
            .filter(|q| q.is_published && q.matches_search(query))
            .collect())
    }

    pub async fn list_owned(&self, creator_id: &str) -> Result<Vec<Quiz>, AppError> {
        Ok(self
            .repo
            .list_quizzes()
            .await?
            .into_iter()
            .filter(|q| q.creator_id == creator_id)
            .collect())
    }

    pub async fn get_quiz(&self, id: &str) -> Result<Quiz, AppError> {
        self.repo
            .get_quiz(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", id)))
    }

    pub async fn create_quiz(
        &self,
        author: &Claims,
        req: CreateQuizRequest,
    ) -> Result<Quiz, AppError> {
        if !author.can_author() {
            return Err(AppError::Forbidden(
                "Only examiners can create quizzes".to_string(),
            ));
        }
        check_questions(&req.questions).map_err(AppError::BadRequest)?;

        let draft = QuizDraft {
            title: non_blank(clean_html(&req.title), "Title")?,
            description: non_blank(clean_html(&req.description), "Description")?,
            creator_id: author.user_id().to_string(),
            questions: build_questions(req.questions, clean_html),
            is_published: req.is_published,
        };
        let quiz = self.repo.create_quiz(draft).await?;
        tracing::info!(quiz_id = %quiz.id, user_id = %author.user_id(), "Quiz created");
        Ok(quiz)
    }

    /// Applies an edit. Once a quiz has attempts, every question id they may
    /// reference must survive the edit.
    pub async fn update_quiz(
        &self,
        editor: &Claims,
        id: &str,
        req: UpdateQuizRequest,
    ) -> Result<Quiz, AppError> {
        let existing = self.get_quiz(id).await?;
        if !editor.may_edit(&existing.creator_id) {
            return Err(AppError::Forbidden(
                "You can only edit your own quizzes".to_string(),
            ));
        }

        let mut patch = QuizPatch {
            is_published: req.is_published,
            ..Default::default()
        };
        if let Some(title) = req.title {
            patch.title = Some(non_blank(clean_html(&title), "Title")?);
        }
        if let Some(description) = req.description {
            patch.description = Some(non_blank(clean_html(&description), "Description")?);
        }
        if let Some(inputs) = req.questions {
            check_questions(&inputs).map_err(AppError::BadRequest)?;
            let questions = build_questions(inputs, clean_html);

            let attempts = self
                .repo
                .list_attempts(AttemptFilter::ByQuiz(id.to_string()))
                .await?;
            if !attempts.is_empty() {
                let kept: Vec<&str> = questions.iter().map(|q| q.id.as_str()).collect();
                if let Some(missing) = existing
                    .question_ids()
                    .into_iter()
                    .find(|qid| !kept.contains(qid))
                {
                    return Err(AppError::Conflict(format!(
                        "Question '{}' has recorded answers and cannot be removed",
                        missing
                    )));
                }
            }
            patch.questions = Some(questions);
        }

        let quiz = self.repo.update_quiz(id, patch).await?;
        tracing::info!(quiz_id = %quiz.id, user_id = %editor.user_id(), "Quiz updated");
        Ok(quiz)
    }

    pub async fn delete_quiz(&self, editor: &Claims, id: &str) -> Result<(), AppError> {
        let existing = self.get_quiz(id).await?;
        if !editor.may_edit(&existing.creator_id) {
            return Err(AppError::Forbidden(
                "You can only delete your own quizzes".to_string(),
            ));
        }
        self.repo.delete_quiz(id).await?;
        tracing::info!(quiz_id = %id, user_id = %editor.user_id(), "Quiz deleted");
        Ok(())
    }

    /// The user's attempts, newest first.
    pub async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<Attempt>, AppError> {
        let mut attempts = self
            .repo
            .list_attempts(AttemptFilter::ByUser(user_id.to_string()))
            .await?;
        attempts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(attempts)
    }

    pub async fn leaderboard(
        &self,
        scope: LeaderboardScope,
        search: Option<&str>,
    ) -> Aggregated<Leaderboard> {
        match self.compute_leaderboard(&scope).await {
            Ok(mut board) => {
                if let Some(query) = search {
                    board.retain_username(query);
                }
                Aggregated::ok(board)
            }
            Err(err) => Aggregated::unavailable(Leaderboard::empty(&scope), err),
        }
    }

    async fn compute_leaderboard(
        &self,
        scope: &LeaderboardScope,
    ) -> Result<Leaderboard, RepositoryError> {
        let usernames = self.identity.usernames().await?;
        Ok(match scope {
            LeaderboardScope::Quiz(quiz_id) => {
                let attempts = self
                    .repo
                    .list_attempts(AttemptFilter::ByQuiz(quiz_id.clone()))
                    .await?;
                Leaderboard::PerQuiz {
                    quiz_id: quiz_id.clone(),
                    entries: leaderboard::per_quiz(quiz_id, &attempts, &usernames),
                }
            }
            LeaderboardScope::All => {
                let quizzes = self.repo.list_quizzes().await?;
                let attempts = self.repo.list_attempts(AttemptFilter::All).await?;
                Leaderboard::CrossQuiz {
                    entries: leaderboard::cross_quiz(&quizzes, &attempts, &usernames),
                }
            }
        })
    }

    /// Snapshot for `creator_id`. A quiz id the creator does not own is a
    /// 404; a failed read is reported through the `error` flag.
    pub async fn analytics(
        &self,
        creator_id: &str,
        quiz_id: Option<&str>,
    ) -> Result<Aggregated<AnalyticsSnapshot>, AppError> {
        let history = async {
            let quizzes = self.repo.list_quizzes().await?;
            let attempts = self.repo.list_attempts(AttemptFilter::All).await?;
            Ok::<_, RepositoryError>((quizzes, attempts))
        };

        match history.await {
            Ok((quizzes, attempts)) => {
                analytics::snapshot(creator_id, quiz_id, &quizzes, &attempts)
                    .map(Aggregated::ok)
                    .map_err(|AnalyticsError::QuizNotOwned(id)| {
                        AppError::NotFound(format!("Quiz {} not found", id))
                    })
            }
            Err(err) => Ok(Aggregated::unavailable(AnalyticsSnapshot::default(), err)),
        }
    }

    /// Registers a user. `is_examiner` selects the examiner role.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        is_examiner: bool,
    ) -> Result<User, AppError> {
        let role = if is_examiner { ROLE_EXAMINER } else { ROLE_USER };
        let hashed = hash_password(password)?;
        let user = self
            .identity
            .create_user(username.trim(), &hashed, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    AppError::Conflict(format!("Username '{}' already exists", username.trim()))
                }
                other => AppError::from(other),
            })?;
        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.identity.find_user_by_username(username.trim()).await?)
    }

    /// Creates the configured admin account unless it already exists.
    pub async fn seed_admin(&self, config: &Config) -> Result<(), AppError> {
        let (Some(username), Some(password)) =
            (&config.admin_username, &config.admin_password)
        else {
            return Ok(());
        };
        if self.identity.find_user_by_username(username).await?.is_some() {
            return Ok(());
        }
        tracing::info!("Seeding admin user: {}", username);
        let hashed = hash_password(password)?;
        self.identity.create_user(username, &hashed, ROLE_ADMIN).await?;
        tracing::info!("Admin user created successfully.");
        Ok(())
    }
}

fn non_blank(value: String, field: &str) -> Result<String, AppError> {
    if value.trim().is_empty() {
        Err(AppError::BadRequest(format!("{} cannot be empty", field)))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::AttemptDraft;
    use crate::models::quiz::QuestionInput;
    use crate::repository::InMemoryRepository;

    fn service() -> (QuizService, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        (QuizService::new(repo.clone(), repo.clone()), repo)
    }

    fn claims(user_id: &str, role: &str) -> Claims {
        Claims {
            sub: user_id.to_string(),
            username: user_id.to_string(),
            role: role.to_string(),
            exp: 0,
        }
    }

    fn question(id: Option<&str>, prompt: &str) -> QuestionInput {
        QuestionInput {
            id: id.map(str::to_string),
            question: prompt.to_string(),
            options: vec!["a".into(), "b".into()],
            correct_option_index: 0,
        }
    }

    fn create_request(questions: Vec<QuestionInput>) -> CreateQuizRequest {
        CreateQuizRequest {
            title: "Capitals".to_string(),
            description: "Geography basics".to_string(),
            questions,
            is_published: true,
        }
    }

    #[tokio::test]
    async fn test_plain_user_cannot_create() {
        let (svc, _) = service();
        let err = svc
            .create_quiz(&claims("u1", "user"), create_request(vec![question(None, "Q")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_sanitizes_text() {
        let (svc, _) = service();
        let quiz = svc
            .create_quiz(
                &claims("u1", "examiner"),
                create_request(vec![question(None, "Pick<script>x()</script>")]),
            )
            .await
            .unwrap();
        assert_eq!(quiz.questions[0].question, "Pick");
        assert_eq!(quiz.creator_id, "u1");
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_may_edit() {
        let (svc, _) = service();
        let quiz = svc
            .create_quiz(&claims("u1", "examiner"), create_request(vec![question(None, "Q")]))
            .await
            .unwrap();
        let rename = || UpdateQuizRequest {
            title: Some("Renamed".into()),
            description: None,
            questions: None,
            is_published: None,
        };

        let err = svc
            .update_quiz(&claims("u2", "examiner"), &quiz.id, rename())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = svc
            .update_quiz(&claims("root", "admin"), &quiz.id, rename())
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
    }

    #[tokio::test]
    async fn test_answered_questions_cannot_be_removed() {
        let (svc, repo) = service();
        let quiz = svc
            .create_quiz(
                &claims("u1", "examiner"),
                create_request(vec![question(Some("keep"), "Q1"), question(Some("drop"), "Q2")]),
            )
            .await
            .unwrap();
        repo.append_attempt(AttemptDraft {
            quiz_id: quiz.id.clone(),
            user_id: "u2".into(),
            score: 0,
            max_score: 2,
            answers: vec![],
        })
        .await
        .unwrap();

        let edit = |ids: &[&str]| UpdateQuizRequest {
            title: None,
            description: None,
            questions: Some(ids.iter().map(|id| question(Some(id), "Q")).collect()),
            is_published: None,
        };

        let err = svc
            .update_quiz(&claims("u1", "examiner"), &quiz.id, edit(&["keep"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let grown = svc
            .update_quiz(&claims("u1", "examiner"), &quiz.id, edit(&["keep", "drop", "new"]))
            .await
            .unwrap();
        assert_eq!(grown.question_count(), 3);
    }

    #[tokio::test]
    async fn test_list_published_filters_drafts_and_search() {
        let (svc, _) = service();
        let author = claims("u1", "examiner");
        svc.create_quiz(&author, create_request(vec![question(None, "Q")]))
            .await
            .unwrap();
        let mut hidden = create_request(vec![question(None, "Q")]);
        hidden.title = "Draft".into();
        hidden.is_published = false;
        svc.create_quiz(&author, hidden).await.unwrap();

        assert_eq!(svc.list_published(None).await.unwrap().len(), 1);
        assert_eq!(svc.list_published(Some("GEOGRAPHY")).await.unwrap().len(), 1);
        assert!(svc.list_published(Some("history")).await.unwrap().is_empty());
        assert_eq!(svc.list_owned("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_closed_repository_flags_aggregations() {
        let (svc, repo) = service();
        repo.close().await;

        let board = svc.leaderboard(LeaderboardScope::All, None).await;
        assert!(board.error.is_some());
        assert!(board.value.is_empty());
        assert!(matches!(
            board.into_result(),
            Err(AppError::AggregationUnavailable(_))
        ));

        let snap = svc.analytics("u1", None).await.unwrap();
        assert!(snap.error.is_some());
        assert_eq!(snap.value, AnalyticsSnapshot::default());
    }

    #[tokio::test]
    async fn test_analytics_rejects_foreign_quiz() {
        let (svc, _) = service();
        let quiz = svc
            .create_quiz(&claims("u1", "examiner"), create_request(vec![question(None, "Q")]))
            .await
            .unwrap();
        let err = svc.analytics("u2", Some(&quiz.id)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let (svc, _) = service();
        svc.register("alice", "secret", false).await.unwrap();
        let err = svc.register("alice", "other", true).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
