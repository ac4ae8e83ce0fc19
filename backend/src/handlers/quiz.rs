// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{CreateQuizRequest, PublicQuiz, QuizListParams, UpdateQuizRequest},
    service::QuizService,
    utils::jwt::Claims,
};

/// Published quizzes, optionally filtered by `?search=` on title or description.
/// Answer keys are never included.
pub async fn list_quizzes(
    State(service): State<QuizService>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = service.list_published(params.search.as_deref()).await?;
    let public: Vec<PublicQuiz> = quizzes.iter().map(PublicQuiz::from).collect();
    Ok(Json(public))
}

/// The caller's own quizzes, drafts included, with answer keys.
pub async fn list_my_quizzes(
    State(service): State<QuizService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.list_owned(claims.user_id()).await?))
}

/// Full quiz for its creator, public view for everyone else.
/// Unpublished quizzes are hidden from other users.
pub async fn get_quiz(
    State(service): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let quiz = service.get_quiz(&id).await?;

    if claims.may_edit(&quiz.creator_id) {
        return Ok(Json(quiz).into_response());
    }
    if !quiz.is_published {
        return Err(AppError::NotFound(format!("Quiz {} not found", id)));
    }
    Ok(Json(PublicQuiz::from(&quiz)).into_response())
}

pub async fn create_quiz(
    State(service): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz = service.create_quiz(&claims, payload).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn update_quiz(
    State(service): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    Ok(Json(service.update_quiz(&claims, &id, payload).await?))
}

pub async fn delete_quiz(
    State(service): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_quiz(&claims, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
