use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use gw_domain::error::Error;

/// Failure surfaced at the HTTP boundary.
///
/// Generation and persistence failures share status 500 and differ in
/// `kind`. A missing context record or an unparseable completion is not
/// an error and never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Unauthorized,
    NotFound(&'static str),
    Validation(String),
    /// The completion call failed or no provider is configured.
    GenerationFailed(&'static str),
    /// A data store read or write failed.
    PersistenceFailed(&'static str),
}

impl ApiError {
    /// Log the cause and return a generation failure carrying `message`.
    pub fn generation(message: &'static str, cause: &Error) -> Self {
        tracing::error!(error = %cause, "{message}: completion failed");
        ApiError::GenerationFailed(message)
    }

    /// Log the cause and return a persistence failure carrying `message`.
    pub fn persistence(message: &'static str, cause: &Error) -> Self {
        tracing::error!(error = %cause, "{message}: data store failed");
        ApiError::PersistenceFailed(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::GenerationFailed(_) | ApiError::PersistenceFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation",
            ApiError::GenerationFailed(_) => "generation_failed",
            ApiError::PersistenceFailed(_) => "persistence_failed",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized => "Unauthorized",
            ApiError::NotFound(m)
            | ApiError::GenerationFailed(m)
            | ApiError::PersistenceFailed(m) => m,
            ApiError::Validation(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = status.as_u16(), kind = self.kind(), "request failed");
        (
            status,
            Json(serde_json::json!({ "error": self.message(), "kind": self.kind() })),
        )
            .into_response()
    }
}
