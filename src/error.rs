//! Error types for the Lector OCR service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

/// Request-level error taxonomy. Validation and storage faults stop the
/// request; engine and probe faults are absorbed earlier and never reach
/// this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Too many files. Maximum allowed: {max}")]
    TooManyFiles { count: usize, max: usize },

    #[error("File {name} is too large. Maximum size: {max} bytes")]
    FileTooLarge { name: String, size: usize, max: u64 },

    #[error("Upload is missing a filename")]
    MissingFilename,

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TooManyFiles { .. } | Self::MissingFilename | Self::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::TooManyFiles { .. } => "too_many_files",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::MissingFilename => "missing_filename",
            Self::Multipart(_) => "bad_request",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_server_error",
        }
    }

    /// Attach the request's correlation id so the error body matches the
    /// `X-Request-ID` header.
    pub fn with_request_id(self, request_id: impl Into<String>) -> ApiError {
        ApiError {
            error: self,
            request_id: Some(request_id.into()),
            details: None,
        }
    }
}

/// An [`AppError`] ready to leave the service, carrying the correlation id.
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub request_id: Option<String>,
    pub details: Option<String>,
}

impl ApiError {
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        ApiError {
            error,
            request_id: None,
            details: None,
        }
    }
}

/// Structured error body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    details: Option<String>,
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let message = self.error.to_string();

        if status.is_server_error() {
            tracing::error!(
                error_type = self.error.error_type(),
                error = %message,
                "Request failed"
            );
        } else {
            tracing::warn!(
                error_type = self.error.error_type(),
                error = %message,
                "Request rejected"
            );
        }

        let body = Json(ErrorResponse {
            error: self.error.error_type(),
            message,
            details: self.details,
            request_id: self.request_id,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let too_many = AppError::TooManyFiles { count: 12, max: 10 };
        assert_eq!(too_many.status_code(), StatusCode::BAD_REQUEST);
        assert!(too_many.to_string().contains("Too many files"));

        let too_large = AppError::FileTooLarge {
            name: "big.png".to_string(),
            size: 11,
            max: 10,
        };
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        assert_eq!(
            AppError::MissingFilename.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_request_id_attachment() {
        let err = AppError::MissingFilename.with_request_id("abc-123");
        assert_eq!(err.request_id.as_deref(), Some("abc-123"));
    }
}
