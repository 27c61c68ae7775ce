use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coverage_lib::CoverageError;
use serde::Serialize;
use utoipa::ToSchema;

pub mod v1;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CoverageError> for ApiError {
    fn from(err: CoverageError) -> Self {
        match err {
            CoverageError::InvalidParameters(message) => Self::bad_request(message),
            CoverageError::SourceUnavailable(err) => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: format!("could not determine indexing progress: {err:#}"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
