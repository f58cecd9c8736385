// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::session_mut,
    session::{AttemptView, Phase, ReviewItem, Session},
    state::{SharedCatalog, SharedSessions},
    utils::session::SessionId,
};

/// Attempt state as seen by the client, with the selected quiz.
#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub selected_quiz: Option<String>,
    #[serde(flatten)]
    pub attempt: AttemptView,
}

fn attempt_response(session: &Session) -> AttemptResponse {
    AttemptResponse {
        selected_quiz: session.selected_quiz.clone(),
        attempt: session.attempt.view(Utc::now()),
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectQuizRequest {
    pub title: String,
}

/// Selects the quiz to take. Choosing a different quiz discards the attempt.
pub async fn select_quiz(
    State(catalog): State<SharedCatalog>,
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
    Json(req): Json<SelectQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = catalog.read().await;
    if catalog.quiz(&req.title).is_none() {
        return Err(AppError::NotFound(format!("Quiz '{}' not found", req.title)));
    }

    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;
    session.select_quiz(&req.title);
    Ok(Json(attempt_response(session)))
}

/// Polled by the client about once a second. Each call advances the timer
/// and may end the attempt when time is up.
pub async fn get_attempt(
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;
    session.attempt.tick(Utc::now());
    Ok(Json(attempt_response(session)))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct StartAttemptRequest {
    /// Minutes; `None` means untimed.
    #[validate(range(max = 600))]
    pub time_limit_minutes: Option<u32>,
}

/// Starts the selected quiz: draws question and option order once and
/// starts the clock.
pub async fn start_attempt(
    State(catalog): State<SharedCatalog>,
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let catalog = catalog.read().await;
    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;

    let title = session
        .selected_quiz
        .clone()
        .ok_or_else(|| AppError::BadRequest("Select a quiz first".to_string()))?;
    let quiz = catalog
        .quiz(&title)
        .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' not found", title)))?;

    session
        .attempt
        .start(quiz, req.time_limit_minutes, Utc::now(), &mut rand::thread_rng())?;
    tracing::info!(
        "Session {} started '{}' (time limit: {:?} min)",
        id,
        title,
        req.time_limit_minutes
    );

    Ok(Json(attempt_response(session)))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// Index into the options as displayed for this attempt.
    pub option: usize,
}

/// Records the answer for the question at `display_index`.
pub async fn answer_question(
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
    Path(display_index): Path<usize>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;
    session.attempt.answer(display_index, req.option, Utc::now())?;
    Ok(Json(attempt_response(session)))
}

/// Scores the attempt. Unanswered questions count as wrong.
pub async fn submit_attempt(
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;

    if session.attempt.phase() != Phase::InProgress {
        return Err(AppError::InvalidState(
            "Only an attempt in progress can be submitted".to_string(),
        ));
    }

    // The deadline may have passed since the last poll, in which case the
    // tick has already scored the attempt as timed out.
    session.attempt.tick(Utc::now());
    if session.attempt.phase() == Phase::InProgress {
        let score = session.attempt.submit()?;
        tracing::info!(
            "Session {} submitted: {}/{}",
            id,
            score.correct,
            score.total
        );
    }

    Ok(Json(attempt_response(session)))
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub revealing: bool,
    pub items: Vec<ReviewItem>,
}

/// Per-question breakdown of an ended attempt.
pub async fn review_attempt(
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;
    let items = session.attempt.review()?;
    Ok(Json(ReviewResponse {
        revealing: session.attempt.is_revealing(),
        items,
    }))
}

pub async fn reveal_answers(
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;
    session.attempt.reveal_answers()?;
    Ok(Json(attempt_response(session)))
}

pub async fn hide_answers(
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;
    session.attempt.hide_answers()?;
    Ok(Json(attempt_response(session)))
}

/// Clears the finished attempt; the quiz stays selected.
pub async fn restart_attempt(
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;
    session.attempt.restart()?;
    Ok(Json(attempt_response(session)))
}
