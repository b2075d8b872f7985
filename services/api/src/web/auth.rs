//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: registration, login, token refresh, logout and
//! the caller's own profile.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use commit_core::{NewUser, PortError, User};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, REFRESH_TOKEN_TTL};
use crate::error::{ApiError, ErrorResponse};
use crate::web::extract::ApiJson;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,50}$").expect("username pattern is valid"));

const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 255;
pub(crate) const MAX_NAME_LEN: usize = 100;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// The public view of an account.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub bio: Option<String>,
    pub timezone: String,
    pub email_verified: bool,
    pub push_notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image_url: user.profile_image_url,
            bio: user.bio,
            timezone: user.timezone,
            email_verified: user.email_verified,
            push_notifications_enabled: user.push_notifications_enabled,
            created_at: user.created_at,
            last_active_at: user.last_active_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Validation
//=========================================================================================

struct Registration {
    email: String,
    username: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Rejects values longer than the column that stores them.
pub(crate) fn check_length(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn validate_registration(req: &RegisterRequest) -> Result<Registration, ApiError> {
    let (Some(email), Some(username), Some(password)) = (
        req.email.as_deref().map(str::trim),
        req.username.as_deref().map(str::trim),
        req.password.as_deref(),
    ) else {
        return Err(ApiError::BadRequest(
            "Email, username, and password are required".to_string(),
        ));
    };

    if !email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    check_length("Email", email, MAX_EMAIL_LEN)?;
    if !USERNAME_PATTERN.is_match(username) {
        return Err(ApiError::BadRequest(
            "Username must be 3-50 characters of letters, digits and underscores".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if let Some(first_name) = &req.first_name {
        check_length("First name", first_name, MAX_NAME_LEN)?;
    }
    if let Some(last_name) = &req.last_name {
        check_length("Last name", last_name, MAX_NAME_LEN)?;
    }

    Ok(Registration {
        email: email.to_lowercase(),
        username: username.to_string(),
        password: password.to_string(),
        first_name: req.first_name.clone(),
        last_name: req.last_name.clone(),
    })
}

/// Argon2 is CPU-bound, so hashing runs on the blocking pool.
async fn hash_off_thread(password: String) -> Result<String, ApiError> {
    let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {e}")))??;
    Ok(hashed)
}

async fn verify_off_thread(password: String, hashed: String) -> Result<bool, ApiError> {
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hashed))
        .await
        .map_err(|e| ApiError::Internal(format!("Password verification task failed: {e}")))??;
    Ok(matches)
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

/// Issues a fresh token pair and stores the refresh token for the user.
async fn issue_session(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let token = state.issuer.issue_access(&user)?;
    let refresh_token = state.issuer.issue_refresh(&user)?;
    state
        .tokens
        .store_refresh_token(user.id, &refresh_token, REFRESH_TOKEN_TTL)
        .await?;
    Ok(AuthResponse {
        user: user.into(),
        token,
        refresh_token,
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Register a new account.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email or username taken", body = ErrorResponse)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let registration = validate_registration(&req)?;

    if state
        .db
        .user_exists(&registration.email, &registration.username)
        .await?
    {
        return Err(ApiError::Conflict(
            "User with this email or username already exists".to_string(),
        ));
    }

    let hashed_password = hash_off_thread(registration.password).await?;
    let user = state
        .db
        .create_user(NewUser {
            email: registration.email,
            username: registration.username,
            hashed_password,
            first_name: registration.first_name,
            last_name: registration.last_name,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    let response = issue_session(&state, user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing credentials", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (Some(email), Some(password)) = (req.email.as_deref(), req.password.as_deref()) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    // 1. Look up the account
    let credentials = match state
        .db
        .get_user_credentials_by_email(&email.trim().to_lowercase())
        .await
    {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => return Err(invalid_credentials()),
        Err(e) => return Err(e.into()),
    };

    // 2. Verify the password
    let password_ok =
        verify_off_thread(password.to_string(), credentials.hashed_password.clone()).await?;
    if !password_ok {
        warn!(user_id = %credentials.user.id, "Failed login attempt");
        return Err(invalid_credentials());
    }
    if !credentials.user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    // 3. Record activity and issue tokens
    state.db.touch_last_active(credentials.user.id).await?;
    info!(user_id = %credentials.user.id, "User logged in");
    let response = issue_session(&state, credentials.user).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new access token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 400, description = "Missing refresh token", body = ErrorResponse),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let refresh_token = req
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Refresh token is required".to_string()))?;
    let invalid = || ApiError::Unauthorized("Invalid refresh token".to_string());

    let claims = state
        .issuer
        .verify_refresh(&refresh_token)
        .map_err(|_| invalid())?;

    let stored = state.tokens.get_refresh_token(claims.sub).await?;
    if stored.as_deref() != Some(refresh_token.as_str()) {
        warn!(user_id = %claims.sub, "Refresh token does not match the stored one");
        return Err(invalid());
    }

    let user = match state.db.get_user_by_id(claims.sub).await {
        Ok(user) if user.is_active => user,
        Ok(_) | Err(PortError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    let token = state.issuer.issue_access(&user)?;
    info!(user_id = %user.id, "Access token refreshed");
    Ok(Json(TokenResponse { token }))
}

/// Revoke the presented access token and the stored refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .tokens
        .blacklist_token(&auth.token, auth.claims.remaining_lifetime())
        .await?;
    state.tokens.delete_refresh_token(auth.id).await?;

    info!(user_id = %auth.id, "User logged out");
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.db.get_user_by_id(auth.id).await?;
    Ok(Json(user.into()))
}
