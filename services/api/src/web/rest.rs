//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ErrorBody, ErrorResponse};
use crate::web::{auth, check_ins, goals, health, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        auth::me_handler,
        users::update_profile_handler,
        goals::list_goals_handler,
        goals::create_goal_handler,
        goals::get_goal_handler,
        goals::update_goal_handler,
        goals::delete_goal_handler,
        goals::goal_stats_handler,
        goals::public_goals_handler,
        goals::list_categories_handler,
        check_ins::list_check_ins_handler,
        check_ins::create_check_in_handler,
        check_ins::get_check_in_handler,
        check_ins::update_check_in_handler,
        check_ins::delete_check_in_handler,
        check_ins::public_check_ins_handler,
    ),
    components(
        schemas(
            ErrorBody,
            ErrorResponse,
            health::HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::RefreshRequest,
            auth::UserResponse,
            auth::AuthResponse,
            auth::TokenResponse,
            auth::MessageResponse,
            users::UpdateProfileRequest,
            goals::CategoryResponse,
            goals::GoalResponse,
            goals::OwnerResponse,
            goals::PublicGoalResponse,
            goals::GoalListResponse,
            goals::PublicGoalFeedResponse,
            goals::GoalStatsResponse,
            goals::CreateGoalRequest,
            goals::UpdateGoalRequest,
            check_ins::CheckInResponse,
            check_ins::CheckInGoalSummary,
            check_ins::PublicCheckInResponse,
            check_ins::CheckInListResponse,
            check_ins::PublicCheckInFeedResponse,
            check_ins::CreateCheckInRequest,
            check_ins::UpdateCheckInRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and token management."),
        (name = "users", description = "The caller's profile."),
        (name = "goals", description = "Goals, statistics and the public goal feed."),
        (name = "check-ins", description = "Daily check-ins and the public check-in feed."),
        (name = "health", description = "Liveness.")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/auth/register",
            "/api/v1/goals/{id}/stats",
            "/api/v1/check-ins/public",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
