// src/handlers/session.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    config::Config,
    error::AppError,
    repository::QuizRepository,
    service::QuizService,
    session::{LiveSession, SessionErrorKind, SessionRegistry},
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub quiz_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub index: usize,
}

/// Looks up a session the caller is allowed to drive.
fn owned_session(
    sessions: &SessionRegistry,
    claims: &Claims,
    session_id: &str,
) -> Result<LiveSession, AppError> {
    let live = sessions
        .get(session_id)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;
    if live.user_id() != claims.user_id() {
        return Err(AppError::Forbidden(
            "This session belongs to another user".to_string(),
        ));
    }
    Ok(live)
}

/// Starts a timed session. Any earlier session of the caller on the same
/// quiz is abandoned.
pub async fn start_session(
    State(service): State<QuizService>,
    State(sessions): State<SessionRegistry>,
    State(repo): State<Arc<dyn QuizRepository>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = service.get_quiz(&payload.quiz_id).await?;
    if !quiz.is_published && !claims.may_edit(&quiz.creator_id) {
        return Err(AppError::NotFound(format!(
            "Quiz {} not found",
            payload.quiz_id
        )));
    }

    let live = sessions
        .start(
            &quiz.id,
            claims.user_id(),
            config.seconds_per_question,
            repo,
        )
        .await?;

    let status = live.status().await;
    if status.error == Some(SessionErrorKind::NotFound) {
        return Err(AppError::NotFound(format!(
            "Quiz {} not found",
            payload.quiz_id
        )));
    }
    Ok((StatusCode::CREATED, Json(status)))
}

pub async fn get_session(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let live = owned_session(&sessions, &claims, &id)?;
    Ok(Json(live.status().await))
}

pub async fn select_option(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<SelectOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let live = owned_session(&sessions, &claims, &id)?;
    Ok(Json(live.select_option(payload.index).await?))
}

pub async fn next_question(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let live = owned_session(&sessions, &claims, &id)?;
    Ok(Json(live.next().await))
}

pub async fn prev_question(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let live = owned_session(&sessions, &claims, &id)?;
    Ok(Json(live.prev().await))
}

/// Submits the current selections. A failed write is reported in the
/// returned status (`errored` / `submission_failed`) and may be retried.
pub async fn submit_session(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let live = owned_session(&sessions, &claims, &id)?;
    Ok(Json(live.submit().await?))
}

pub async fn abandon_session(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    owned_session(&sessions, &claims, &id)?;
    sessions.abandon(&id).await;
    Ok(StatusCode::NO_CONTENT)
}
