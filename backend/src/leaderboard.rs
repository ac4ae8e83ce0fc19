// src/leaderboard.rs

//! Rankings derived from the attempt history. Nothing here is cached: every
//! call re-scans the attempts it is given.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{
    config::CROSS_QUIZ_LEADERBOARD_LIMIT,
    models::{
        attempt::Attempt,
        leaderboard::{AggregateEntry, LeaderboardEntry},
        quiz::Quiz,
    },
};

/// Display name for `user_id`, falling back to `user-` plus the first five
/// characters of the id when the identity store does not know the user.
pub fn display_name(user_id: &str, usernames: &HashMap<String, String>) -> String {
    match usernames.get(user_id) {
        Some(name) => name.clone(),
        None => format!("user-{}", user_id.chars().take(5).collect::<String>()),
    }
}

/// Best attempt per user on one quiz, highest score first.
///
/// A later attempt only replaces a user's best when it scores strictly
/// higher, so among equal scores the earliest attempt is kept. Ties between
/// users are ordered by the earliest completion time of their best attempt,
/// then by user id.
pub fn per_quiz(
    quiz_id: &str,
    attempts: &[Attempt],
    usernames: &HashMap<String, String>,
) -> Vec<LeaderboardEntry> {
    let mut best: HashMap<&str, &Attempt> = HashMap::new();

    for attempt in attempts.iter().filter(|a| a.quiz_id == quiz_id) {
        let improves = best
            .get(attempt.user_id.as_str())
            .map_or(true, |current| attempt.score > current.score);
        if improves {
            best.insert(attempt.user_id.as_str(), attempt);
        }
    }

    let mut entries: Vec<LeaderboardEntry> = best
        .into_values()
        .map(|a| LeaderboardEntry {
            user_id: a.user_id.clone(),
            username: display_name(&a.user_id, usernames),
            score: a.score,
            max_score: a.max_score,
            completed_at: a.completed_at,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.completed_at.cmp(&b.completed_at))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    entries
}

fn ratio(total_score: u32, total_max_score: u32) -> f64 {
    if total_max_score == 0 {
        0.0
    } else {
        f64::from(total_score) / f64::from(total_max_score)
    }
}

/// Sums every user's per-quiz bests over all published quizzes and ranks
/// them by overall ratio, then by how many quizzes they took. At most
/// [`CROSS_QUIZ_LEADERBOARD_LIMIT`] rows are returned.
pub fn cross_quiz(
    quizzes: &[Quiz],
    attempts: &[Attempt],
    usernames: &HashMap<String, String>,
) -> Vec<AggregateEntry> {
    let mut totals: HashMap<String, AggregateEntry> = HashMap::new();

    for quiz in quizzes.iter().filter(|q| q.is_published) {
        for entry in per_quiz(&quiz.id, attempts, usernames) {
            let total = totals
                .entry(entry.username.clone())
                .or_insert_with(|| AggregateEntry {
                    username: entry.username.clone(),
                    total_score: 0,
                    total_max_score: 0,
                    quiz_count: 0,
                    ratio: 0.0,
                    quiz_titles: Vec::new(),
                });
            total.total_score += entry.score;
            total.total_max_score += entry.max_score;
            total.quiz_count += 1;
            total.quiz_titles.push(quiz.title.clone());
        }
    }

    let mut ranked: Vec<AggregateEntry> = totals
        .into_values()
        .map(|mut e| {
            e.ratio = ratio(e.total_score, e.total_max_score);
            e
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.ratio
            .partial_cmp(&a.ratio)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.quiz_count.cmp(&a.quiz_count))
            .then_with(|| b.total_score.cmp(&a.total_score))
            .then_with(|| a.username.cmp(&b.username))
    });
    ranked.truncate(CROSS_QUIZ_LEADERBOARD_LIMIT);
    ranked
}
