use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::auth::{AccessTokenClaims, JwtError};
use crate::core::DbError;
use crate::db::Role;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Password error: {0}")]
    PasswordHashingFailed(#[from] argon2::password_hash::Error),

    #[error("{0}")]
    Jwt(#[from] JwtError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(e) if e.is_constraint_violation() => StatusCode::CONFLICT,
            Self::Jwt(e) if e.is_client_error() => StatusCode::UNAUTHORIZED,
            Self::Internal(_) | Self::Database(_) | Self::PasswordHashingFailed(_) | Self::Jwt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                error_type = %std::any::type_name::<Self>(),
                error_message = %self);
        } else {
            tracing::debug!(status = %status, error_message = %self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Turns a missing row into a 404 with the given message.
pub trait OrNotFound<T> {
    fn or_not_found(self, message: &'static str) -> ApiResult<T>;
}

impl<T> OrNotFound<T> for Result<T, DbError> {
    fn or_not_found(self, message: &'static str) -> ApiResult<T> {
        self.map_err(|e| if e.is_not_found() { ApiError::NotFound(message) } else { e.into() })
    }
}

pub fn require_admin(claims: &AccessTokenClaims) -> ApiResult<()> {
    if claims.role == Role::SuperAdmin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required"))
    }
}

pub fn require_positive(value: f64, field: &str) -> ApiResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("{field} must be greater than zero")))
    }
}
