//! services/api/src/web/users.rs
//!
//! Profile editing for the authenticated user.

use axum::{extract::State, Json};
use commit_core::ProfileUpdate;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorResponse};
use crate::web::auth::{check_length, UserResponse, MAX_NAME_LEN};
use crate::web::extract::ApiJson;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

const MAX_TIMEZONE_LEN: usize = 50;

/// Omitted fields keep their current value.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub timezone: Option<String>,
    pub profile_image_url: Option<String>,
    pub push_notifications_enabled: Option<bool>,
}

/// Update the caller's profile.
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if req.timezone.as_deref().is_some_and(|tz| tz.trim().is_empty()) {
        return Err(ApiError::BadRequest("Timezone cannot be empty".to_string()));
    }
    if let Some(timezone) = &req.timezone {
        check_length("Timezone", timezone, MAX_TIMEZONE_LEN)?;
    }
    if let Some(first_name) = &req.first_name {
        check_length("First name", first_name, MAX_NAME_LEN)?;
    }
    if let Some(last_name) = &req.last_name {
        check_length("Last name", last_name, MAX_NAME_LEN)?;
    }

    let user = state
        .db
        .update_profile(
            auth.id,
            ProfileUpdate {
                first_name: req.first_name,
                last_name: req.last_name,
                bio: req.bio,
                timezone: req.timezone,
                profile_image_url: req.profile_image_url,
                push_notifications_enabled: req.push_notifications_enabled,
            },
        )
        .await?;
    Ok(Json(user.into()))
}
