// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::leaderboard::{LeaderboardParams, LeaderboardScope},
    service::QuizService,
};

/// `?quiz=<id>` for one quiz, `?quiz=all` (or nothing) for the cross-quiz
/// ranking. `?search=` keeps rows whose username contains the query.
pub async fn get_leaderboard(
    State(service): State<QuizService>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let scope = LeaderboardScope::parse(params.quiz.as_deref());
    let board = service
        .leaderboard(scope, params.search.as_deref())
        .await
        .into_result()?;
    Ok(Json(board))
}
