// src/session/handle.rs

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{
    countdown::spawn_countdown,
    machine::{AttemptSession, FinalizeTrigger, SessionCommandError, SessionStatus},
};
use crate::{
    repository::{QuizRepository, RepositoryError},
    scoring::ScoringError,
};

/// A running session together with its countdown.
///
/// Clones share the same session. The countdown is cancelled when the
/// session finishes, when it is abandoned, or when the last clone is dropped.
#[derive(Clone)]
pub struct LiveSession {
    id: String,
    quiz_id: String,
    user_id: String,
    inner: Arc<Mutex<AttemptSession>>,
    repo: Arc<dyn QuizRepository>,
    cancel: CancellationToken,
    _cancel_on_drop: Arc<DropGuard>,
}

impl LiveSession {
    /// Loads the quiz and, if it exists, starts the countdown.
    pub async fn start(
        id: &str,
        quiz_id: &str,
        user_id: &str,
        seconds_per_question: u64,
        repo: Arc<dyn QuizRepository>,
    ) -> Result<Self, RepositoryError> {
        let mut session = AttemptSession::new(id, quiz_id, user_id, seconds_per_question);
        session.load(repo.as_ref()).await?;
        let in_progress = session.is_in_progress();

        let cancel = CancellationToken::new();
        let live = Self {
            id: id.to_string(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            inner: Arc::new(Mutex::new(session)),
            repo,
            _cancel_on_drop: Arc::new(cancel.clone().drop_guard()),
            cancel,
        };

        if in_progress {
            spawn_countdown(live.inner.clone(), live.repo.clone(), live.cancel.clone());
            tracing::info!(
                session_id = %id,
                quiz_id = %quiz_id,
                user_id = %user_id,
                "Session started"
            );
        } else {
            tracing::warn!(
                session_id = %id,
                quiz_id = %quiz_id,
                "Session started for unknown quiz"
            );
        }

        Ok(live)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.lock().await.status()
    }

    pub async fn select_option(&self, index: usize) -> Result<SessionStatus, SessionCommandError> {
        let mut session = self.inner.lock().await;
        session.select_option(index)?;
        Ok(session.status())
    }

    pub async fn next(&self) -> SessionStatus {
        let mut session = self.inner.lock().await;
        session.next();
        session.status()
    }

    pub async fn prev(&self) -> SessionStatus {
        let mut session = self.inner.lock().await;
        session.prev();
        session.status()
    }

    /// Manual submission. Only the first effective finalization counts; the
    /// returned status reflects the outcome of the write.
    pub async fn submit(&self) -> Result<SessionStatus, ScoringError> {
        let mut session = self.inner.lock().await;
        session.finalize(self.repo.as_ref(), FinalizeTrigger::Manual).await?;
        if !session.is_in_progress() {
            self.cancel.cancel();
        }
        Ok(session.status())
    }

    /// Stops the countdown and ends the session without writing anything,
    /// unless it already completed.
    pub async fn abandon(&self) -> SessionStatus {
        self.cancel.cancel();
        let mut session = self.inner.lock().await;
        session.abandon();
        tracing::info!(session_id = %self.id, "Session abandoned");
        session.status()
    }

    pub fn countdown_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
