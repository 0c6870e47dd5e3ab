//! Maps `domain::error::Error` onto HTTP status codes at the server edge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::error::Error;

/// Newtype so the edge, not `domain`, owns the HTTP mapping — the core stays transport-agnostic.
pub struct ApiError(pub Error);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            Error::Validation { .. } => (StatusCode::BAD_REQUEST, "validation"),
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Error::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "permission_denied"),
            Error::UnsupportedFileType { .. } => (StatusCode::BAD_REQUEST, "unsupported_file_type"),
            Error::ParseError { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::EmptyExtraction { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "empty_extraction"),
            Error::EmbeddingDimensionMismatch { .. } | Error::DataIntegrity { .. } => {
                (StatusCode::BAD_GATEWAY, "data_integrity")
            }
            Error::Transient { .. } => (StatusCode::BAD_GATEWAY, "transient"),
            Error::BlobMissing { .. } => (StatusCode::NOT_FOUND, "blob_missing"),
            Error::Config { .. } | Error::Internal { .. } | Error::Io { .. } | Error::Json { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        let body = ErrorBody {
            error: kind.to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
