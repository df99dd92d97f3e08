//! Admin sessions.
//!
//! Login exchanges the admin password for a short-lived token held in
//! Redis; the browser carries it in an `HttpOnly` cookie. Every mutating
//! route passes through [`require_admin`], so possession of the cookie is
//! checked server-side on each request and a logout (or the TTL) kills the
//! session everywhere at once.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{
        HeaderMap, StatusCode,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{
    database::{SESSION_TTL_SECONDS, create_session, revoke_session, session_valid},
    error::AppError,
    state::AppState,
};

pub const SESSION_COOKIE: &str = "admin_session";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// Compare digests so the check does not short-circuit on the first
/// differing byte.
fn password_matches(candidate: &str, expected: &str) -> bool {
    Sha256::digest(candidate.as_bytes()) == Sha256::digest(expected.as_bytes())
}

pub fn extract_session_cookie(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
        .next()
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_session_cookie)
        .map(str::to_string)
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !password_matches(&payload.password, &state.config.admin_password) {
        return Err(AppError::Unauthorized);
    }

    let mut conn = state.redis_connection.clone();
    let token = create_session(&mut conn).await?;

    info!("Admin session opened");

    let cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={SESSION_TTL_SECONDS}"
    );

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), StatusCode::NO_CONTENT))
}

pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token(&headers) {
        let mut conn = state.redis_connection.clone();
        revoke_session(&mut conn, &token).await?;
    }

    let cookie = format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0");

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), StatusCode::NO_CONTENT))
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(request.headers()).ok_or(AppError::Unauthorized)?;

    let mut conn = state.redis_connection.clone();
    if !session_valid(&mut conn, &token).await? {
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_session_cookie() {
        assert_eq!(
            extract_session_cookie("admin_session=abc123"),
            Some("abc123")
        );
        assert_eq!(
            extract_session_cookie("lang=es; admin_session=abc123; consent=1"),
            Some("abc123")
        );
        assert_eq!(extract_session_cookie("lang=es"), None);
        assert_eq!(extract_session_cookie(""), None);
    }

    #[test]
    fn test_prefix_named_cookie_is_ignored() {
        assert_eq!(extract_session_cookie("xadmin_session=abc"), None);
    }

    #[test]
    fn test_password_matches() {
        assert!(password_matches("hunter2", "hunter2"));
        assert!(!password_matches("hunter2", "hunter3"));
        assert!(!password_matches("", "hunter2"));
    }
}
