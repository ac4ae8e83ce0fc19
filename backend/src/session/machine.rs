// src/session/machine.rs

use serde::Serialize;
use thiserror::Error;

use crate::{
    models::{
        attempt::AttemptDraft,
        quiz::{PublicQuestion, Quiz},
    },
    repository::{QuizRepository, RepositoryError},
    scoring::{self, ScoringError},
};

/// Why a session ended in `Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorKind {
    /// The quiz id did not resolve when the session started.
    NotFound,
    /// The attempt could not be persisted. `submit()` retries.
    SubmissionFailed,
}

/// What caused finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeTrigger {
    Manual,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    InProgress,
    Completed {
        attempt_id: String,
        score: u32,
        max_score: u32,
    },
    Errored(SessionErrorKind),
    /// Left by the user before completion. Nothing was written.
    Abandoned,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionCommandError {
    #[error("option {index} does not exist, question has {options} options")]
    OptionOutOfRange { index: usize, options: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Loading,
    InProgress,
    Completed,
    Errored,
    Abandoned,
}

/// Feedback band shown with a completed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Mastered,
    Progressing,
    NeedsPractice,
}

impl Grade {
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            p if p >= 70 => Grade::Mastered,
            p if p >= 40 => Grade::Progressing,
            _ => Grade::NeedsPractice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResult {
    pub attempt_id: String,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub grade: Grade,
}

/// Read-only view of a session for the caller to render.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub quiz_id: String,
    pub quiz_title: Option<String>,
    pub state: StatusKind,
    pub cursor: usize,
    pub question_count: usize,
    pub remaining_seconds: u64,
    pub current_question: Option<PublicQuestion>,
    pub selections: Vec<Option<usize>>,
    pub finalized_by: Option<FinalizeTrigger>,
    pub result: Option<SessionResult>,
    pub error: Option<SessionErrorKind>,
}

/// One user's timed run through one quiz.
///
/// `Loading -> InProgress -> Completed`, with `Errored` reachable from
/// `Loading` (unknown quiz) and from finalization (write failure). Commands
/// on a session that is not `InProgress` are no-ops.
#[derive(Debug)]
pub struct AttemptSession {
    id: String,
    quiz_id: String,
    user_id: String,
    seconds_per_question: u64,
    quiz: Option<Quiz>,
    state: SessionState,
    cursor: usize,
    selections: Vec<Option<usize>>,
    remaining_seconds: u64,
    finalized_by: Option<FinalizeTrigger>,
}

impl AttemptSession {
    pub fn new(id: &str, quiz_id: &str, user_id: &str, seconds_per_question: u64) -> Self {
        Self {
            id: id.to_string(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            seconds_per_question,
            quiz: None,
            state: SessionState::Loading,
            cursor: 0,
            selections: Vec::new(),
            remaining_seconds: 0,
            finalized_by: None,
        }
    }

    /// Resolves the quiz id. A storage failure is returned as-is and leaves
    /// the session in `Loading`.
    pub async fn load(&mut self, repo: &dyn QuizRepository) -> Result<(), RepositoryError> {
        let quiz = repo.get_quiz(&self.quiz_id).await?;
        self.begin(quiz);
        Ok(())
    }

    /// `Loading -> InProgress` with an unanswered buffer and a full countdown,
    /// or `Loading -> Errored(NotFound)`.
    pub fn begin(&mut self, quiz: Option<Quiz>) {
        if self.state != SessionState::Loading {
            return;
        }
        match quiz {
            Some(quiz) => {
                let n = quiz.questions.len();
                self.selections = vec![None; n];
                self.remaining_seconds = self.seconds_per_question * n as u64;
                self.cursor = 0;
                self.quiz = Some(quiz);
                self.state = SessionState::InProgress;
            }
            None => {
                self.state = SessionState::Errored(SessionErrorKind::NotFound);
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == SessionState::InProgress
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    fn question_count(&self) -> usize {
        self.quiz.as_ref().map_or(0, |q| q.questions.len())
    }

    /// Overwrites the selection for the current question.
    pub fn select_option(&mut self, index: usize) -> Result<(), SessionCommandError> {
        if !self.is_in_progress() {
            return Ok(());
        }
        let options = self
            .quiz
            .as_ref()
            .and_then(|q| q.questions.get(self.cursor))
            .map_or(0, |q| q.options.len());
        if index >= options {
            return Err(SessionCommandError::OptionOutOfRange { index, options });
        }
        self.selections[self.cursor] = Some(index);
        Ok(())
    }

    /// Moves to the next question; stays put on the last one.
    pub fn next(&mut self) {
        if self.is_in_progress() && self.cursor + 1 < self.question_count() {
            self.cursor += 1;
        }
    }

    /// Moves to the previous question; stays put on the first one.
    pub fn prev(&mut self) {
        if self.is_in_progress() && self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// One second of countdown. Returns true once time has run out and the
    /// session should be finalized.
    pub fn tick(&mut self) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.remaining_seconds == 0
    }

    /// Whether `finalize` would do anything: a live session, or a failed
    /// submission waiting for a retry.
    pub fn can_finalize(&self) -> bool {
        matches!(
            self.state,
            SessionState::InProgress | SessionState::Errored(SessionErrorKind::SubmissionFailed)
        )
    }

    /// Scores the current buffer and appends the attempt.
    ///
    /// `Completed` is only entered after the repository confirmed the write;
    /// a write failure lands in `Errored(SubmissionFailed)` with the buffer
    /// kept, so a later call retries with the same selections.
    pub async fn finalize(
        &mut self,
        repo: &dyn QuizRepository,
        trigger: FinalizeTrigger,
    ) -> Result<(), ScoringError> {
        if !self.can_finalize() {
            return Ok(());
        }
        let Some(quiz) = self.quiz.as_ref() else {
            return Ok(());
        };

        let outcome = scoring::score(quiz, &self.selections)?;
        let draft = AttemptDraft {
            quiz_id: quiz.id.clone(),
            user_id: self.user_id.clone(),
            score: outcome.correct_count,
            max_score: outcome.max_score,
            answers: outcome.answers,
        };

        match repo.append_attempt(draft).await {
            Ok(attempt) => {
                tracing::info!(
                    session_id = %self.id,
                    quiz_id = %attempt.quiz_id,
                    user_id = %attempt.user_id,
                    attempt_id = %attempt.id,
                    trigger = ?trigger,
                    "Attempt recorded: {}/{}",
                    attempt.score,
                    attempt.max_score
                );
                self.state = SessionState::Completed {
                    attempt_id: attempt.id,
                    score: attempt.score,
                    max_score: attempt.max_score,
                };
                self.finalized_by = Some(trigger);
            }
            Err(e) => {
                tracing::error!(
                    session_id = %self.id,
                    quiz_id = %self.quiz_id,
                    trigger = ?trigger,
                    "Failed to record attempt: {}",
                    e
                );
                self.state = SessionState::Errored(SessionErrorKind::SubmissionFailed);
                self.finalized_by = Some(trigger);
            }
        }
        Ok(())
    }

    /// Marks the session as left by the user. Completed sessions are kept as
    /// they are; anything else ends without writing an attempt.
    pub fn abandon(&mut self) {
        if matches!(self.state, SessionState::Completed { .. }) {
            return;
        }
        self.state = SessionState::Abandoned;
    }

    pub fn status(&self) -> SessionStatus {
        let (state, result, error) = match &self.state {
            SessionState::Loading => (StatusKind::Loading, None, None),
            SessionState::InProgress => (StatusKind::InProgress, None, None),
            SessionState::Completed {
                attempt_id,
                score,
                max_score,
            } => {
                let percentage = scoring::percentage(*score, *max_score);
                (
                    StatusKind::Completed,
                    Some(SessionResult {
                        attempt_id: attempt_id.clone(),
                        score: *score,
                        max_score: *max_score,
                        percentage,
                        grade: Grade::from_percentage(percentage),
                    }),
                    None,
                )
            }
            SessionState::Errored(kind) => (StatusKind::Errored, None, Some(*kind)),
            SessionState::Abandoned => (StatusKind::Abandoned, None, None),
        };

        let current_question = if self.is_in_progress() {
            self.quiz
                .as_ref()
                .and_then(|q| q.questions.get(self.cursor))
                .map(PublicQuestion::from)
        } else {
            None
        };

        SessionStatus {
            session_id: self.id.clone(),
            quiz_id: self.quiz_id.clone(),
            quiz_title: self.quiz.as_ref().map(|q| q.title.clone()),
            state,
            cursor: self.cursor,
            question_count: self.question_count(),
            remaining_seconds: self.remaining_seconds,
            current_question,
            selections: self.selections.clone(),
            finalized_by: self.finalized_by,
            result,
            error,
        }
    }
}
