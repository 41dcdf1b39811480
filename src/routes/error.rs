use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::video::ErrorResponse;
use crate::services::generation::{ArtifactError, SubmitError};
use crate::services::scheduler::SchedulerError;
use crate::services::uploads::UploadError;

/// Error returned by API handlers, rendered as `{"success": false, "error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Request failed");
        }
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        let status = match &e {
            SubmitError::MissingField(_)
            | SubmitError::Validation(_)
            | SubmitError::InvalidMusicReference(_) => StatusCode::BAD_REQUEST,
            SubmitError::InvalidUploadReference(_) => StatusCode::NOT_FOUND,
            SubmitError::Scheduler(SchedulerError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ArtifactError> for ApiError {
    fn from(e: ArtifactError) -> Self {
        let status = match &e {
            ArtifactError::NotFound(_) | ArtifactError::Missing(_) => StatusCode::NOT_FOUND,
            ArtifactError::NotReady(_) => StatusCode::BAD_REQUEST,
        };
        Self::new(status, e.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Io(_) => Self::internal(e.to_string()),
            _ => Self::bad_request(e.to_string()),
        }
    }
}
