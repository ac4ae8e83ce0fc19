// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-question outcome, frozen when the attempt is created.
/// Editing the quiz later never rewrites `is_correct`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    /// `None` when the question was left unanswered.
    pub selected_option_index: Option<usize>,
    pub is_correct: bool,
}

/// One completed run of a user through a quiz.
/// Attempts are append-only: they are written once and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub score: u32,
    pub max_score: u32,
    pub completed_at: DateTime<Utc>,
    pub answers: Vec<AnswerRecord>,
}

impl Attempt {
    /// Score divided by max score, 0 for an empty quiz.
    pub fn ratio(&self) -> f64 {
        if self.max_score == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.max_score)
        }
    }
}

/// An attempt before the repository assigns its id and completion time.
#[derive(Debug, Clone)]
pub struct AttemptDraft {
    pub quiz_id: String,
    pub user_id: String,
    pub score: u32,
    pub max_score: u32,
    pub answers: Vec<AnswerRecord>,
}

/// Which slice of the attempt history to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFilter {
    All,
    ByUser(String),
    ByQuiz(String),
}

impl AttemptFilter {
    pub fn matches(&self, attempt: &Attempt) -> bool {
        match self {
            AttemptFilter::All => true,
            AttemptFilter::ByUser(user_id) => &attempt.user_id == user_id,
            AttemptFilter::ByQuiz(quiz_id) => &attempt.quiz_id == quiz_id,
        }
    }
}
