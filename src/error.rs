use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{models::ErrorResponse, repository::RepoError, session::AuthError};

/// AppError
///
/// Every way a page action can fail. Rendered as a JSON `{ "error": ... }` body the
/// client shows as a non-fatal notification; nothing on the server changes, so the
/// user can simply retry.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repository(#[from] RepoError),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Auth(AuthError::Rejected { status: 401, .. })
            | AppError::Auth(AuthError::InvalidToken(_)) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::Rejected { status, .. }) if *status >= 500 => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Auth(AuthError::Rejected { .. }) | AppError::Auth(AuthError::MissingVerifier) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Auth(AuthError::Transport(_)) => StatusCode::BAD_GATEWAY,
            AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Malformed input is the caller's to fix, so both rejections surface as 400.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(format!("Invalid address: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            AppError::Repository(error) => {
                tracing::error!(%error, "data store operation failed");
                "Something went wrong with your data. Please try again.".to_string()
            }
            AppError::Auth(AuthError::Transport(error)) => {
                tracing::error!(%error, "auth service unreachable");
                "The sign-in service is unavailable. Please try again.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
