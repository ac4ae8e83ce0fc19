// src/analytics.rs

//! Creator-facing statistics, recomputed from the full history on every call.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    config::{QUESTION_PREVIEW_CHARS, RECENT_ATTEMPTS_LIMIT},
    models::{
        analytics::{AnalyticsSnapshot, QuestionStat, RecentAttempt},
        attempt::Attempt,
        quiz::Quiz,
    },
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("quiz {0} does not exist or is not owned by this creator")]
    QuizNotOwned(String),
}

/// Shortens `text` to `max_chars` characters plus "..." when it is longer.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Correct/total tallies for every question of `quiz`, in question order.
pub fn question_stats(quiz: &Quiz, attempts: &[Attempt]) -> Vec<QuestionStat> {
    let mut tallies: HashMap<&str, (u32, u32)> = HashMap::new();
    for attempt in attempts.iter().filter(|a| a.quiz_id == quiz.id) {
        for answer in &attempt.answers {
            let tally = tallies.entry(answer.question_id.as_str()).or_default();
            tally.1 += 1;
            if answer.is_correct {
                tally.0 += 1;
            }
        }
    }

    quiz.questions
        .iter()
        .map(|q| {
            let (correct, total) = tallies.get(q.id.as_str()).copied().unwrap_or((0, 0));
            QuestionStat {
                question_id: q.id.clone(),
                question: q.question.clone(),
                correct,
                total,
                correct_rate: if total == 0 {
                    1.0
                } else {
                    f64::from(correct) / f64::from(total)
                },
            }
        })
        .collect()
}

/// The question with the strictly lowest correct rate below 1.0; the first
/// one wins ties. Unanswered questions sit at 1.0 and are never picked, so a
/// quiz that everyone answered perfectly has no hardest question.
pub fn hardest_question(stats: &[QuestionStat]) -> Option<&QuestionStat> {
    let mut lowest_rate = 1.0;
    let mut hardest = None;
    for stat in stats {
        if stat.correct_rate < lowest_rate {
            lowest_rate = stat.correct_rate;
            hardest = Some(stat);
        }
    }
    hardest
}

/// The creator's quiz with the most attempts, first one on ties.
pub fn most_popular<'a>(owned: &[&'a Quiz], attempts: &[Attempt]) -> Option<&'a Quiz> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for attempt in attempts {
        *counts.entry(attempt.quiz_id.as_str()).or_default() += 1;
    }

    let mut best: Option<(&Quiz, usize)> = None;
    for quiz in owned {
        let count = counts.get(quiz.id.as_str()).copied().unwrap_or(0);
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((quiz, count));
        }
    }
    best.map(|(quiz, _)| quiz)
}

/// Builds the snapshot for `creator_id`, focused on `selected_quiz_id` or,
/// when none is given, on the creator's first quiz.
pub fn snapshot(
    creator_id: &str,
    selected_quiz_id: Option<&str>,
    quizzes: &[Quiz],
    attempts: &[Attempt],
) -> Result<AnalyticsSnapshot, AnalyticsError> {
    let owned: Vec<&Quiz> = quizzes.iter().filter(|q| q.creator_id == creator_id).collect();

    let selected = match selected_quiz_id {
        Some(id) => Some(
            owned
                .iter()
                .copied()
                .find(|q| q.id == id)
                .ok_or_else(|| AnalyticsError::QuizNotOwned(id.to_string()))?,
        ),
        None => owned.first().copied(),
    };

    let most_popular_quiz = most_popular(&owned, attempts)
        .map(|q| q.title.clone())
        .unwrap_or_default();

    let Some(quiz) = selected else {
        return Ok(AnalyticsSnapshot {
            total_quizzes: owned.len(),
            most_popular_quiz,
            ..Default::default()
        });
    };

    let quiz_attempts: Vec<&Attempt> = attempts.iter().filter(|a| a.quiz_id == quiz.id).collect();
    let total_attempts = quiz_attempts.len();

    let average_score = if total_attempts == 0 {
        0.0
    } else {
        quiz_attempts.iter().map(|a| a.ratio()).sum::<f64>() / total_attempts as f64
    };

    let (score_sum, max_sum) = quiz_attempts.iter().fold((0u64, 0u64), |(s, m), a| {
        (s + u64::from(a.score), m + u64::from(a.max_score))
    });
    let overall_percentage = if max_sum == 0 {
        0.0
    } else {
        score_sum as f64 / max_sum as f64 * 100.0
    };

    let stats = question_stats(quiz, attempts);
    let hardest = hardest_question(&stats)
        .map(|s| truncate_preview(&s.question, QUESTION_PREVIEW_CHARS))
        .unwrap_or_default();

    let mut recent: Vec<&Attempt> = quiz_attempts.clone();
    recent.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    let recent_attempts = recent
        .into_iter()
        .take(RECENT_ATTEMPTS_LIMIT)
        .map(|a| RecentAttempt {
            attempt_id: a.id.clone(),
            user_id: a.user_id.clone(),
            score: a.score,
            max_score: a.max_score,
            completed_at: a.completed_at,
        })
        .collect();

    Ok(AnalyticsSnapshot {
        selected_quiz_id: Some(quiz.id.clone()),
        total_quizzes: owned.len(),
        total_attempts,
        average_score,
        overall_percentage,
        most_popular_quiz,
        hardest_question: hardest,
        question_stats: stats,
        recent_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::AnswerRecord;
    use crate::models::quiz::Question;
    use chrono::{Duration, TimeZone, Utc};

    fn quiz(id: &str, title: &str, creator: &str, prompts: &[&str]) -> Quiz {
        Quiz {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            creator_id: creator.to_string(),
            created_at: Utc::now(),
            questions: prompts
                .iter()
                .enumerate()
                .map(|(i, p)| Question {
                    id: format!("{}-q{}", id, i + 1),
                    question: p.to_string(),
                    options: vec!["yes".into(), "no".into()],
                    correct_option_index: 0,
                })
                .collect(),
            is_published: true,
        }
    }

    /// `pattern[i]` says whether question i was answered correctly.
    fn attempt(quiz: &Quiz, user: &str, pattern: &[bool], minute: i64) -> Attempt {
        let answers: Vec<AnswerRecord> = quiz
            .questions
            .iter()
            .zip(pattern)
            .map(|(q, ok)| AnswerRecord {
                question_id: q.id.clone(),
                selected_option_index: Some(if *ok { 0 } else { 1 }),
                is_correct: *ok,
            })
            .collect();
        Attempt {
            id: format!("{}-{}-{}", quiz.id, user, minute),
            quiz_id: quiz.id.clone(),
            user_id: user.to_string(),
            score: pattern.iter().filter(|ok| **ok).count() as u32,
            max_score: quiz.questions.len() as u32,
            completed_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minute),
            answers,
        }
    }

    #[test]
    fn test_most_popular_quiz_by_attempt_count() {
        let a = quiz("a", "A", "c1", &["one"]);
        let b = quiz("b", "B", "c1", &["one"]);
        let mut attempts: Vec<Attempt> = (0..10).map(|i| attempt(&a, "u", &[true], i)).collect();
        attempts.extend((0..3).map(|i| attempt(&b, "u", &[true], 100 + i)));

        let snap = snapshot("c1", Some("b"), &[a, b], &attempts).unwrap();
        assert_eq!(snap.most_popular_quiz, "A");
        assert_eq!(snap.total_quizzes, 2);
        assert_eq!(snap.total_attempts, 3);
    }

    #[test]
    fn test_most_popular_tie_keeps_first_quiz() {
        let a = quiz("a", "First", "c1", &["one"]);
        let b = quiz("b", "Second", "c1", &["one"]);
        let attempts = vec![attempt(&a, "u", &[true], 0), attempt(&b, "u", &[true], 1)];
        let snap = snapshot("c1", None, &[a, b], &attempts).unwrap();
        assert_eq!(snap.most_popular_quiz, "First");
    }

    #[test]
    fn test_creator_without_quizzes_gets_empty_snapshot() {
        let other = quiz("a", "A", "someone-else", &["one"]);
        let snap = snapshot("c1", None, &[other], &[]).unwrap();
        assert_eq!(snap.total_quizzes, 0);
        assert_eq!(snap.most_popular_quiz, "");
        assert_eq!(snap.selected_quiz_id, None);
    }

    #[test]
    fn test_foreign_quiz_is_rejected() {
        let other = quiz("a", "A", "someone-else", &["one"]);
        assert_eq!(
            snapshot("c1", Some("a"), &[other], &[]),
            Err(AnalyticsError::QuizNotOwned("a".to_string()))
        );
    }

    #[test]
    fn test_average_score_is_mean_of_ratios() {
        let q = quiz("a", "A", "c1", &["one", "two"]);
        let attempts = vec![
            attempt(&q, "u1", &[true, true], 0),
            attempt(&q, "u2", &[true, false], 1),
            attempt(&q, "u3", &[false, false], 2),
        ];
        let snap = snapshot("c1", Some("a"), &[q], &attempts).unwrap();
        assert!((snap.average_score - 0.5).abs() < 1e-9);
        assert!((snap.overall_percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_attempts_means_zero_average_and_no_hardest_question() {
        let q = quiz("a", "A", "c1", &["one", "two"]);
        let snap = snapshot("c1", Some("a"), &[q], &[]).unwrap();
        assert_eq!(snap.average_score, 0.0);
        assert_eq!(snap.hardest_question, "");
        assert!(snap.question_stats.iter().all(|s| s.correct_rate == 1.0));
    }

    #[test]
    fn test_hardest_question_has_lowest_rate() {
        let q = quiz("a", "A", "c1", &["easy", "hard", "medium"]);
        let attempts = vec![
            attempt(&q, "u1", &[true, false, true], 0),
            attempt(&q, "u2", &[true, false, false], 1),
        ];
        let snap = snapshot("c1", Some("a"), &[q], &attempts).unwrap();
        assert_eq!(snap.hardest_question, "hard");
    }

    #[test]
    fn test_perfect_answers_leave_no_hardest_question() {
        let stats = vec![
            QuestionStat {
                question_id: "q1".into(),
                question: "never answered".into(),
                correct: 0,
                total: 0,
                correct_rate: 1.0,
            },
            QuestionStat {
                question_id: "q2".into(),
                question: "always right".into(),
                correct: 4,
                total: 4,
                correct_rate: 1.0,
            },
        ];
        assert!(hardest_question(&stats).is_none());
    }

    #[test]
    fn test_all_correct_attempt_has_empty_hardest_question() {
        let q = quiz("a", "A", "c1", &["Everyone got this right", "And this one"]);
        let attempts = vec![attempt(&q, "u1", &[true, true], 0)];
        let snap = snapshot("c1", Some("a"), &[q], &attempts).unwrap();
        assert_eq!(snap.hardest_question, "");
    }

    #[test]
    fn test_hardest_question_tie_keeps_first() {
        let q = quiz("a", "A", "c1", &["first", "second"]);
        let attempts = vec![attempt(&q, "u1", &[false, false], 0)];
        let snap = snapshot("c1", Some("a"), &[q], &attempts).unwrap();
        assert_eq!(snap.hardest_question, "first");
    }

    #[test]
    fn test_long_prompt_is_truncated() {
        let long = "x".repeat(60);
        assert_eq!(truncate_preview(&long, 50), format!("{}...", "x".repeat(50)));
        assert_eq!(truncate_preview("short", 50), "short");
        assert_eq!(truncate_preview(&"é".repeat(50), 50), "é".repeat(50));
    }

    #[test]
    fn test_recent_attempts_newest_first_and_capped() {
        let q = quiz("a", "A", "c1", &["one"]);
        let attempts: Vec<Attempt> = (0..8).map(|i| attempt(&q, "u", &[true], i)).collect();
        let snap = snapshot("c1", None, &[q], &attempts).unwrap();
        assert_eq!(snap.recent_attempts.len(), RECENT_ATTEMPTS_LIMIT);
        assert!(snap.recent_attempts[0].completed_at > snap.recent_attempts[1].completed_at);
        assert_eq!(snap.recent_attempts[0].attempt_id, "a-u-7");
    }
}
