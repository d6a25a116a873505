use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use doctero_core::AppError;
use doctero_domain::BackupError;

mod types;

pub use types::ErrorResponse;

/// HTTP API error wrapper around application and backup errors.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    Backup(BackupError),
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl From<BackupError> for ApiError {
    fn from(value: BackupError) -> Self {
        Self::Backup(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::App(AppError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::App(AppError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::App(AppError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backup(BackupError::ExportFailed(_) | BackupError::Io(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Backup(BackupError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Backup(BackupError::SkippedOverlap(_)) => StatusCode::CONFLICT,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::App(error) => error.code(),
            Self::Backup(error) => error.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::App(error) => error.to_string(),
            Self::Backup(error) => error.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "request failed");
        }

        let payload = Json(ErrorResponse::new(self.code(), message));

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
