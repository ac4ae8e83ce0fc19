// src/models/analytics.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Correctness tally for one question of the selected quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionStat {
    pub question_id: String,
    pub question: String,
    pub correct: u32,
    pub total: u32,
    /// `correct / total`, 1.0 when nobody has answered yet.
    pub correct_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentAttempt {
    pub attempt_id: String,
    pub user_id: String,
    pub score: u32,
    pub max_score: u32,
    pub completed_at: DateTime<Utc>,
}

/// Creator-facing statistics. Derived on every request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AnalyticsSnapshot {
    pub selected_quiz_id: Option<String>,
    pub total_quizzes: usize,
    pub total_attempts: usize,
    /// Mean of `score / max_score` over the selected quiz's attempts.
    pub average_score: f64,
    /// Sum of scores over sum of max scores, as a percentage.
    pub overall_percentage: f64,
    pub most_popular_quiz: String,
    pub hardest_question: String,
    pub question_stats: Vec<QuestionStat>,
    pub recent_attempts: Vec<RecentAttempt>,
}

/// Query string for `GET /api/analytics`.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsParams {
    pub quiz_id: Option<String>,
}
