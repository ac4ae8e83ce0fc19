// src/handlers/attempt.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, service::QuizService, utils::jwt::Claims};

/// The caller's attempt history, newest first.
pub async fn list_my_attempts(
    State(service): State<QuizService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.attempts_for_user(claims.user_id()).await?))
}
