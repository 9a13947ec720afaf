//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the unified error type for all node endpoints. It
//! implements `axum::response::IntoResponse` to produce structured JSON error
//! responses with appropriate HTTP status codes:
//!
//! ```json
//! { "success": false, "error": { "code": "...", "message": "...", "details": ... } }
//! ```
//!
//! A refused delete answers 409 with `details.dependents` listing every
//! saved query that depends on the target.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use leaf_core::{CoreError, DependentsConflict, QueryDependent, UniversalId};
use leaf_storage::StorageError;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured details (e.g., the dependents of a refused delete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API errors with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Entity not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller does not own the query (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The save would create a recursive dependency (422).
    #[error("{0}")]
    RecursiveDependency(String),

    /// Other saved queries depend on the query being deleted (409).
    #[error("{} saved queries depend on {query}", .dependents.len())]
    DependentsExist {
        query: UniversalId,
        dependents: Vec<QueryDependent>,
    },

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, ApiErrorDetail) {
        let detail = |code: &str, details: Option<serde_json::Value>| ApiErrorDetail {
            code: code.to_string(),
            message: self.to_string(),
            details,
        };
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, detail("NOT_FOUND", None)),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, detail("BAD_REQUEST", None)),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, detail("FORBIDDEN", None)),
            ApiError::RecursiveDependency(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                detail("RECURSIVE_DEPENDENCY", None),
            ),
            ApiError::DependentsExist { dependents, .. } => (
                StatusCode::CONFLICT,
                detail(
                    "DEPENDENTS_EXIST",
                    serde_json::to_value(DependentsConflict {
                        dependents: dependents.clone(),
                    })
                    .ok(),
                ),
            ),
            ApiError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("INTERNAL_ERROR", None),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "success": false,
            "error": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::QueryNotFound(_) => ApiError::NotFound(err.to_string()),
            StorageError::NotOwner { .. } => ApiError::Forbidden(err.to_string()),
            StorageError::Validation(core) => core.into(),
            StorageError::Serialization(_)
            | StorageError::Sqlite(_)
            | StorageError::Migration(_)
            | StorageError::IntegrityError { .. } => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RecursiveDependency { .. } => ApiError::RecursiveDependency(err.to_string()),
            CoreError::NoHomeNode
            | CoreError::MultipleHomeNodes { .. }
            | CoreError::DuplicateNode { .. } => ApiError::InternalError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependents_conflict_carries_dependents_in_details() {
        let err = ApiError::DependentsExist {
            query: "urn:leaf:query:a".into(),
            dependents: vec![QueryDependent {
                universal_id: "urn:leaf:query:b".into(),
                name: "B".into(),
                owner: "bob".into(),
            }],
        };
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::CONFLICT);
        let details = detail.details.unwrap();
        assert_eq!(details["dependents"][0]["owner"], "bob");
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let not_found: ApiError = StorageError::QueryNotFound("x".into()).into();
        assert_eq!(not_found.status_and_detail().0, StatusCode::NOT_FOUND);

        let forbidden: ApiError = StorageError::NotOwner {
            universal_id: "x".into(),
            owner: "bob".into(),
        }
        .into();
        assert_eq!(forbidden.status_and_detail().0, StatusCode::FORBIDDEN);
    }
}
