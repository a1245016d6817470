//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::oracle::OracleError;
use crate::pipeline::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// All errors that can occur at the dispatch boundary are represented
/// by this enum. Each variant implements automatic conversion to HTTP
/// responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// No pipeline is waiting at the given id
    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    /// The request targeted a pipeline waiting at a different stage
    #[error("Stage mismatch: {0}")]
    StageMismatch(String),

    /// The external text-generation capability failed
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// The pipeline run backing this request died before producing
    /// its next event
    #[error("Pipeline run failed: {0}")]
    PipelineFailed(String),

    /// Request body failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NoPendingEdit(id) => AppError::PipelineNotFound(id),
            PipelineError::StageMismatch { .. } => AppError::StageMismatch(err.to_string()),
            PipelineError::Oracle(e) => AppError::Oracle(e),
            other => AppError::PipelineFailed(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::PipelineNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::StageMismatch(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Oracle(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::PipelineFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Stage;

    #[test]
    fn test_unknown_edit_maps_to_not_found() {
        let err: AppError = PipelineError::NoPendingEdit("abc".to_string()).into();
        assert!(matches!(err, AppError::PipelineNotFound(_)));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_stage_mismatch_maps_to_conflict() {
        let err: AppError = PipelineError::StageMismatch {
            id: "abc".to_string(),
            expected: Stage::Verification,
            claimed: Stage::Fixing,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_oracle_error_maps_to_bad_gateway() {
        let err: AppError =
            PipelineError::Oracle(OracleError::Transport("down".to_string())).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
