// src/models/leaderboard.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's best attempt on one quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub score: u32,
    pub max_score: u32,
    /// Completion time of the attempt that holds the best score.
    pub completed_at: DateTime<Utc>,
}

/// A user's per-quiz bests summed across every published quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateEntry {
    pub username: String,
    pub total_score: u32,
    pub total_max_score: u32,
    pub quiz_count: u32,
    pub ratio: f64,
    /// Titles of the quizzes that contributed, in scan order.
    pub quiz_titles: Vec<String>,
}

/// Which leaderboard to compute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardScope {
    Quiz(String),
    All,
}

impl LeaderboardScope {
    /// `"all"` (or nothing) selects the cross-quiz board, anything else is a quiz id.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => LeaderboardScope::All,
            Some(id) => LeaderboardScope::Quiz(id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Leaderboard {
    PerQuiz {
        quiz_id: String,
        entries: Vec<LeaderboardEntry>,
    },
    CrossQuiz {
        entries: Vec<AggregateEntry>,
    },
}

impl Leaderboard {
    pub fn empty(scope: &LeaderboardScope) -> Self {
        match scope {
            LeaderboardScope::Quiz(quiz_id) => Leaderboard::PerQuiz {
                quiz_id: quiz_id.clone(),
                entries: Vec::new(),
            },
            LeaderboardScope::All => Leaderboard::CrossQuiz {
                entries: Vec::new(),
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Leaderboard::PerQuiz { entries, .. } => entries.len(),
            Leaderboard::CrossQuiz { entries } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keeps only rows whose username contains `query`, ignoring case.
    /// Ranking order is preserved.
    pub fn retain_username(&mut self, query: &str) {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return;
        }
        match self {
            Leaderboard::PerQuiz { entries, .. } => {
                entries.retain(|e| e.username.to_lowercase().contains(&query))
            }
            Leaderboard::CrossQuiz { entries } => {
                entries.retain(|e| e.username.to_lowercase().contains(&query))
            }
        }
    }
}

/// Query string for `GET /api/leaderboard`.
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardParams {
    pub quiz: Option<String>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        assert_eq!(LeaderboardScope::parse(None), LeaderboardScope::All);
        assert_eq!(LeaderboardScope::parse(Some("all")), LeaderboardScope::All);
        assert_eq!(
            LeaderboardScope::parse(Some("quiz-1")),
            LeaderboardScope::Quiz("quiz-1".to_string())
        );
    }

    #[test]
    fn test_retain_username_keeps_order() {
        let entry = |name: &str, score| LeaderboardEntry {
            user_id: name.to_string(),
            username: name.to_string(),
            score,
            max_score: 5,
            completed_at: Utc::now(),
        };
        let mut board = Leaderboard::PerQuiz {
            quiz_id: "q".into(),
            entries: vec![entry("Alice", 5), entry("bob", 4), entry("alina", 3)],
        };
        board.retain_username("AL");
        match board {
            Leaderboard::PerQuiz { entries, .. } => {
                let names: Vec<_> = entries.iter().map(|e| e.username.as_str()).collect();
                assert_eq!(names, vec!["Alice", "alina"]);
            }
            _ => panic!("scope changed"),
        }
    }
}
