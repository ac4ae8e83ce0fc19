// src/handlers/analytics.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError, models::analytics::AnalyticsParams, service::QuizService,
    utils::jwt::Claims,
};

/// Statistics over the caller's own quizzes, focused on `?quiz_id=` or on
/// their first quiz.
pub async fn get_analytics(
    State(service): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = service
        .analytics(claims.user_id(), params.quiz_id.as_deref())
        .await?
        .into_result()?;
    Ok(Json(snapshot))
}
