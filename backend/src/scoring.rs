// src/scoring.rs

use thiserror::Error;

use crate::models::{attempt::AnswerRecord, quiz::Quiz};

/// Raised when the caller breaks the one-selection-per-question contract.
/// This is a programming error, never a user-facing condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("expected {expected} selections, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Result of grading one set of selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOutcome {
    pub correct_count: u32,
    pub max_score: u32,
    pub answers: Vec<AnswerRecord>,
}

/// Grades `selections` against the quiz answer key.
///
/// `selections[i]` is the option picked for `quiz.questions[i]`, or `None`
/// when unanswered. An unanswered question is always wrong. Each correct
/// answer is worth one point.
pub fn score(quiz: &Quiz, selections: &[Option<usize>]) -> Result<ScoreOutcome, ScoringError> {
    if selections.len() != quiz.questions.len() {
        return Err(ScoringError::LengthMismatch {
            expected: quiz.questions.len(),
            actual: selections.len(),
        });
    }

    let mut correct_count = 0;
    let answers = quiz
        .questions
        .iter()
        .zip(selections)
        .map(|(question, selected)| {
            let is_correct = *selected == Some(question.correct_option_index);
            if is_correct {
                correct_count += 1;
            }
            AnswerRecord {
                question_id: question.id.clone(),
                selected_option_index: *selected,
                is_correct,
            }
        })
        .collect();

    Ok(ScoreOutcome {
        correct_count,
        max_score: quiz.questions.len() as u32,
        answers,
    })
}

/// Whole-number percentage, rounded half up.
pub fn percentage(score: u32, max_score: u32) -> u32 {
    if max_score == 0 {
        return 0;
    }
    ((f64::from(score) / f64::from(max_score)) * 100.0).round() as u32
}
