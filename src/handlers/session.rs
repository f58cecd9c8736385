// src/handlers/session.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    handlers::session_mut,
    state::{AppState, SharedSessions},
    utils::session::SessionId,
};

/// Opens a new visitor session and returns its token.
pub async fn create_session(
    State(sessions): State<SharedSessions>,
) -> Result<impl IntoResponse, AppError> {
    let id = sessions.write().await.create(Utc::now());
    Ok((StatusCode::CREATED, Json(json!({ "session_id": id }))))
}

/// Returns what the server knows about the caller's session.
pub async fn current_session(
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = sessions.write().await;
    let session = session_mut(&mut store, &id)?;
    Ok(Json(json!({
        "session_id": session.id,
        "admin": session.admin,
        "selected_quiz": session.selected_quiz,
        "created_at": session.created_at,
        "last_seen": session.last_seen,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// Unlocks admin mode for this session when the secret matches exactly.
pub async fn login(
    State(state): State<AppState>,
    Extension(SessionId(id)): Extension<SessionId>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !state.admin_secret.matches(&payload.password)? {
        tracing::warn!("Failed admin login for session {}", id);
        return Err(AppError::AuthError("Wrong password".to_string()));
    }

    let mut store = state.sessions.write().await;
    session_mut(&mut store, &id)?.admin = true;
    tracing::info!("Session {} entered admin mode", id);

    Ok(Json(json!({ "admin": true })))
}

pub async fn logout(
    State(sessions): State<SharedSessions>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = sessions.write().await;
    session_mut(&mut store, &id)?.admin = false;
    Ok(Json(json!({ "admin": false })))
}
