//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use crate::auth::AuthError;
use crate::config::{ConfigError, Environment};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use commit_core::ports::PortError;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from the Redis client.
    #[error("Cache Error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Auth Error: {0}")]
    Auth(#[from] AuthError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Port(port) => match port {
                PortError::NotFound(_) => StatusCode::NOT_FOUND,
                PortError::Conflict(_) => StatusCode::CONFLICT,
                PortError::Forbidden(_) => StatusCode::FORBIDDEN,
                PortError::Unauthorized => StatusCode::UNAUTHORIZED,
                PortError::Validation(_) => StatusCode::BAD_REQUEST,
                PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(auth) => match auth {
                AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            },
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Cache(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to clients. Server-side failures never leak details here.
    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m) => m.clone(),
            ApiError::Port(PortError::NotFound(m)) => m.clone(),
            ApiError::Port(PortError::Conflict(m)) => m.clone(),
            ApiError::Port(PortError::Validation(m)) => m.clone(),
            ApiError::Port(PortError::Forbidden(_)) => "Access denied".to_string(),
            ApiError::Port(PortError::Unauthorized) => "Unauthorized".to_string(),
            ApiError::Auth(AuthError::ExpiredToken) => "Access token expired".to_string(),
            ApiError::Auth(AuthError::InvalidToken) | ApiError::Auth(AuthError::WrongTokenType) => {
                "Invalid access token".to_string()
            }
            _ => "Internal server error".to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The JSON envelope of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    fn render(status: StatusCode, message: String, detail: Option<String>) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                message,
                status_code: status.as_u16(),
                detail,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// The cause of a server-side failure, carried as a response extension.
/// Only `expose_error_details` puts it in the body.
#[derive(Clone, Debug)]
pub struct InternalDetail {
    message: String,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.public_message();

        if status.is_server_error() {
            error!("Request failed: {:?}", self);
            let mut response = ErrorResponse::render(status, message.clone(), None);
            response.extensions_mut().insert(InternalDetail {
                message,
                detail: self.to_string(),
            });
            return response;
        }

        if status == StatusCode::FORBIDDEN {
            warn!("Access denied: {}", self);
        }
        ErrorResponse::render(status, message, None)
    }
}

/// Response mapper that adds `detail` to 5xx bodies in development.
pub async fn expose_error_details(
    State(environment): State<Environment>,
    mut response: Response,
) -> Response {
    let Some(internal) = response.extensions_mut().remove::<InternalDetail>() else {
        return response;
    };
    if !environment.is_development() {
        return response;
    }
    ErrorResponse::render(response.status(), internal.message, Some(internal.detail))
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
