// src/utils/session.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{error::AppError, state::SharedSessions};

/// Session token of the current request, inserted by [`session_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

/// Reads the `Authorization: Bearer <token>` header.
fn bearer_token(req: &Request<Body>) -> Option<Uuid> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token.trim()).ok()
}

/// Axum Middleware: Session lookup.
///
/// Resolves the bearer token to a known session and injects its [`SessionId`]
/// into the request extensions. Each request renews the session's idle
/// timer. Unknown, expired or missing tokens get 401.
pub async fn session_middleware(
    State(sessions): State<SharedSessions>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let id = bearer_token(&req)
        .ok_or_else(|| AppError::AuthError("Missing session token".to_string()))?;

    if !sessions.write().await.touch(&id, Utc::now()) {
        return Err(AppError::AuthError("Unknown session".to_string()));
    }

    req.extensions_mut().insert(SessionId(id));
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `session_middleware`. Lets the request through only
/// when the session has unlocked admin mode; otherwise 403.
pub async fn admin_middleware(
    State(sessions): State<SharedSessions>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let SessionId(id) = *req
        .extensions()
        .get::<SessionId>()
        .ok_or_else(|| AppError::AuthError("Missing session token".to_string()))?;

    let is_admin = sessions
        .read()
        .await
        .get(&id)
        .is_some_and(|session| session.admin);

    if !is_admin {
        return Err(AppError::Forbidden("Admin mode required".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        let id = Uuid::new_v4();
        let req = Request::builder()
            .header(header::AUTHORIZATION, format!("Bearer {}", id))
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), Some(id));

        let bad = Request::builder()
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&bad), None);

        let missing = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&missing), None);
    }
}
