//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::web::state::AppState;

/// The caller of a protected route, as established by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    /// The raw bearer token, kept so logout can blacklist it.
    pub token: String,
    pub claims: Claims,
}

/// Middleware that validates the bearer access token.
///
/// If valid, inserts an `AuthUser` into request extensions for handlers to use.
/// Missing, malformed, expired, blacklisted or refresh tokens get a 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))?
        .to_string();

    // 2. Reject revoked tokens
    if state.tokens.is_blacklisted(&token).await? {
        debug!("Rejected blacklisted token");
        return Err(ApiError::Unauthorized("Token has been revoked".to_string()));
    }

    // 3. Verify signature, expiry and type
    let claims = state.issuer.verify_access(&token)?;

    // 4. Insert the caller into request extensions
    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        token,
        claims,
    });

    // 5. Continue to the handler
    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))
    }
}
