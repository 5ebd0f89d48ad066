use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use serde_json::json;
use thiserror::Error;

use crate::{attendance::state::ClockRejection, auth::jwt::AuthError, store::StoreError};

// Stable, machine-readable identifiers. Clients match on these, never on
// the message.
pub mod error_code {
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Error type returned by every handler. Renders as
/// `{"code": "...", "error": "..."}`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Punch refused by the attendance rules. HTTP 400.
    #[error(transparent)]
    StateConflict(#[from] ClockRejection),

    /// HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Unique value already taken. HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// HTTP 401.
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    /// Storage failure; the operation was rolled back. HTTP 500.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store(StoreError::Database(e))
    }
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => error_code::VALIDATION_FAILED,
            AppError::StateConflict(rejection) => rejection.code(),
            AppError::NotFound(_) => error_code::NOT_FOUND,
            AppError::Conflict(_) => error_code::ALREADY_EXISTS,
            AppError::Unauthorized(_) => error_code::UNAUTHENTICATED,
            AppError::Store(_) | AppError::Internal(_) => error_code::INTERNAL,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::StateConflict(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Store(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "code": self.error_code(),
            "error": message,
        }))
    }
}

fn invalid_input(message: String) -> actix_web::Error {
    let response = AppError::Validation(message.clone()).error_response();
    actix_web::error::InternalError::from_response(message, response).into()
}

/// Malformed JSON bodies get the same error shape as every other bad input.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| invalid_input(format!("Invalid request body: {}", err)))
}

/// Query strings that do not deserialize (e.g. `?page=abc`).
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| invalid_input(format!("Invalid query parameters: {}", err)))
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| invalid_input(format!("Invalid path parameter: {}", err)))
}
