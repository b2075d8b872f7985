pub mod auth;
pub mod check_ins;
pub mod extract;
pub mod goals;
pub mod health;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod users;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::expose_error_details;

pub use middleware::{require_auth, AuthUser};
pub use state::AppState;

/// Builds the full application router: `/health` plus the `/api/v1` surface.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/goals/public", get(goals::public_goals_handler))
        .route("/goals/categories", get(goals::list_categories_handler))
        .route("/check-ins/public", get(check_ins::public_check_ins_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/me", get(auth::me_handler))
        .route("/users/me", put(users::update_profile_handler))
        .route(
            "/goals",
            get(goals::list_goals_handler).post(goals::create_goal_handler),
        )
        .route(
            "/goals/{id}",
            get(goals::get_goal_handler)
                .put(goals::update_goal_handler)
                .delete(goals::delete_goal_handler),
        )
        .route("/goals/{id}/stats", get(goals::goal_stats_handler))
        .route(
            "/check-ins",
            get(check_ins::list_check_ins_handler).post(check_ins::create_check_in_handler),
        )
        .route(
            "/check-ins/{id}",
            get(check_ins::get_check_in_handler)
                .put(check_ins::update_check_in_handler)
                .delete(check_ins::delete_check_in_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api_router = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/v1", api_router)
        .layer(axum_middleware::map_response_with_state(
            state.config.environment,
            expose_error_details,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
