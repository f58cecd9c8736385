// src/handlers/mod.rs

use uuid::Uuid;

use crate::error::AppError;
use crate::session::{Session, SessionStore};

pub mod admin;
pub mod catalog;
pub mod quiz;
pub mod session;

/// Looks up the session resolved by the session middleware.
/// It can only be missing if it vanished between middleware and handler.
pub(crate) fn session_mut<'a>(
    store: &'a mut SessionStore,
    id: &Uuid,
) -> Result<&'a mut Session, AppError> {
    store
        .get_mut(id)
        .ok_or_else(|| AppError::AuthError("Unknown session".to_string()))
}
