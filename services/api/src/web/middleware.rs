//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use membership_core::{PortError, SessionContext};
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::web::state::AppState;

/// Reads the auth session id from the `session` cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|c| c.trim().strip_prefix("session="))
        })
        .filter(|token| !token.is_empty());

    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
        })
        .filter(|token| !token.is_empty())
}

/// Middleware that validates the auth session and resolves the caller's
/// `SessionContext`.
///
/// If valid, inserts the context into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the session id from the cookie or bearer header
    let auth_session_id = session_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("No session found".to_string()))?
        .to_string();

    // 2. Validate auth session in database, get user_id
    let user_id = match state.db.validate_auth_session(&auth_session_id).await {
        Ok(user_id) => user_id,
        Err(PortError::Unauthorized) | Err(PortError::NotFound(_)) => {
            warn!("Rejected an unknown or expired auth session");
            return Err(ApiError::Unauthorized(
                "Session is invalid or expired".to_string(),
            ));
        }
        Err(e) => {
            error!("Failed to validate auth session: {:?}", e);
            return Err(ApiError::Port(e));
        }
    };

    // 3. Resolve the role once for the whole request
    let ctx = SessionContext::resolve(state.db.as_ref(), user_id).await;

    // 4. Insert the context into request extensions
    req.extensions_mut().insert(ctx);

    // 5. Continue to the handler
    Ok(next.run(req).await)
}

/// Gate for the `/admin` routes. Must run after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let ctx = req
        .extensions()
        .get::<SessionContext>()
        .copied()
        .unwrap_or_else(SessionContext::anonymous);
    ctx.require_admin()?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers), Some("abc"));
    }

    #[test]
    fn bearer_is_accepted_without_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers), Some("xyz"));
    }

    #[test]
    fn empty_credentials_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_token(&headers), None);
    }
}
