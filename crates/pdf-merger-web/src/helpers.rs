//! Helper types and traits for cleaner route handlers.
//!
//! Every failure leaves the service as JSON `{"error": ..., "code": ...}` with
//! a status derived from the core error classification.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pdf_merger_core::{Error, ErrorKind};
use serde::Serialize;
use tracing::{error, warn};

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, ApiError>;

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// HTTP status for each error kind.
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::FormDecodeFailed | ErrorKind::NoFilesProvided | ErrorKind::NoMergeableContent => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::TooManyFiles | ErrorKind::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::ContentMismatch => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::FileOpenFailed
        | ErrorKind::ConversionFailed
        | ErrorKind::MergeFailed
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        Self::new(status_for(kind), kind.code(), err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{} ({}): {}", self.status, self.code, self.message);
        } else {
            warn!("{} ({}): {}", self.status, self.code, self.message);
        }

        let body = ErrorBody {
            error: &self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| {
            let kind = ErrorKind::Internal;
            ApiError::new(status_for(kind), kind.code(), e.to_string())
        })
    }
}
