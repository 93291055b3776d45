use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::context::CancelReason;
use crate::users::repo_types::Field;
use crate::users::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("field {field} failed validation: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("{field} is already taken")]
    Conflict { field: Field },

    /// Same value for an unknown email and a wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("missing or malformed authorization header")]
    MissingToken,

    #[error("you can only update your own account")]
    Forbidden,

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Cancelled(#[from] CancelReason),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(field) => AppError::Conflict { field },
            other => AppError::Store(other),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(anyhow::anyhow!("background task failed: {err}"))
    }
}

impl AppError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        AppError::Validation { field, message }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::MissingToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn field(&self) -> Option<String> {
        match self {
            AppError::Validation { field, .. } => Some((*field).to_string()),
            AppError::Conflict { field } => Some(field.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: message,
            field: self.field(),
        };
        (status, Json(body)).into_response()
    }
}
