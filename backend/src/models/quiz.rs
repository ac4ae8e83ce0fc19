// src/models/quiz.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::{MAX_OPTIONS, MIN_OPTIONS};

/// A single multiple-choice question inside a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within its quiz. Attempts reference questions by this id.
    pub id: String,

    /// The prompt text.
    pub question: String,

    /// Between 2 and 6 options, in display order.
    pub options: Vec<String>,

    /// Index into `options` of the correct answer.
    pub correct_option_index: usize,
}

/// A stored quiz definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
    pub is_published: bool,
}

impl Quiz {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question_ids(&self) -> HashSet<&str> {
        self.questions.iter().map(|q| q.id.as_str()).collect()
    }

    /// Case-insensitive substring match on title or description.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// Everything needed to create a quiz except the id and creation timestamp,
/// which the repository assigns.
#[derive(Debug, Clone)]
pub struct QuizDraft {
    pub title: String,
    pub description: String,
    pub creator_id: String,
    pub questions: Vec<Question>,
    pub is_published: bool,
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct QuizPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub questions: Option<Vec<Question>>,
    pub is_published: Option<bool>,
}

impl QuizPatch {
    pub fn apply_to(self, quiz: &mut Quiz) {
        if let Some(title) = self.title {
            quiz.title = title;
        }
        if let Some(description) = self.description {
            quiz.description = description;
        }
        if let Some(questions) = self.questions {
            quiz.questions = questions;
        }
        if let Some(is_published) = self.is_published {
            quiz.is_published = is_published;
        }
    }
}

/// DTO for sending a question to quiz takers (excludes the answer key).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question: q.question.clone(),
            options: q.options.clone(),
        }
    }
}

/// DTO for sending a quiz to anyone but its creator.
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    pub question_count: usize,
    pub questions: Vec<PublicQuestion>,
    pub is_published: bool,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            creator_id: quiz.creator_id.clone(),
            created_at: quiz.created_at,
            question_count: quiz.questions.len(),
            questions: quiz.questions.iter().map(PublicQuestion::from).collect(),
            is_published: quiz.is_published,
        }
    }
}

/// Question as submitted by a quiz author. The id is optional on create.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionInput {
    #[validate(length(max = 64))]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub correct_option_index: usize,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Vec<QuestionInput>,
    #[serde(default)]
    pub is_published: bool,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Option<Vec<QuestionInput>>,
    pub is_published: Option<bool>,
}

/// Query string for `GET /api/quizzes`.
#[derive(Debug, Default, Deserialize)]
pub struct QuizListParams {
    pub search: Option<String>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(validator::ValidationError::new("options_count_out_of_range"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Checks the rules the derive cannot express: blank text, the answer key
/// bound and question id uniqueness. Messages are meant for the quiz author.
pub fn check_questions(questions: &[QuestionInput]) -> Result<(), String> {
    if questions.is_empty() {
        return Err("A quiz needs at least one question".to_string());
    }

    let mut seen = HashSet::new();
    for (i, q) in questions.iter().enumerate() {
        if q.question.trim().is_empty() {
            return Err(format!("Question {} is empty", i + 1));
        }
        if q.options.len() < MIN_OPTIONS || q.options.len() > MAX_OPTIONS {
            return Err(format!(
                "Question {} must have between {} and {} options",
                i + 1,
                MIN_OPTIONS,
                MAX_OPTIONS
            ));
        }
        for (j, opt) in q.options.iter().enumerate() {
            if opt.trim().is_empty() {
                return Err(format!("Option {} in question {} is empty", j + 1, i + 1));
            }
        }
        if q.correct_option_index >= q.options.len() {
            return Err(format!(
                "Question {} has no option at index {}",
                i + 1,
                q.correct_option_index
            ));
        }
        if let Some(id) = &q.id {
            if id.trim().is_empty() {
                return Err(format!("Question {} has a blank id", i + 1));
            }
            if !seen.insert(id.as_str()) {
                return Err(format!("Duplicate question id '{}'", id));
            }
        }
    }
    Ok(())
}

/// Turns validated inputs into stored questions, minting ids where missing.
/// `clean` is applied to every piece of free text.
pub fn build_questions(
    inputs: Vec<QuestionInput>,
    clean: impl Fn(&str) -> String,
) -> Vec<Question> {
    inputs
        .into_iter()
        .map(|input| Question {
            id: input
                .id
                .unwrap_or_else(|| format!("q-{}", uuid::Uuid::new_v4())),
            question: clean(&input.question),
            options: input.options.iter().map(|o| clean(o)).collect(),
            correct_option_index: input.correct_option_index,
        })
        .collect()
}
