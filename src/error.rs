use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

/// Failures talking to the upstream ranked API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("upstream returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("upstream rejected credentials for {0} after token refresh")]
    Unauthorized(String),

    #[error("upstream token refresh failed: {0}")]
    TokenRefresh(String),
}

/// Service-level error surfaced to callers of the reconciliation engine,
/// the batch jobs and the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum StrikrError {
    #[error("player '{0}' not found")]
    PlayerNotFound(String),

    #[error("cached player id {cached} does not match upstream id {upstream} for '{username}'")]
    IdentityMismatch {
        username: String,
        cached: String,
        upstream: String,
    },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),

    #[error("store write failed: {0}")]
    StoreWriteFailure(#[from] sqlx::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("job '{0}' is already running")]
    JobAlreadyRunning(&'static str),
}

pub type StrikrResult<T> = Result<T, StrikrError>;

impl IntoResponse for StrikrError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            StrikrError::PlayerNotFound(_) => {
                (StatusCode::NOT_FOUND, "PLAYER_NOT_FOUND", self.to_string())
            }
            StrikrError::IdentityMismatch { .. } => {
                error!(error = %self, "Identity mismatch between cache and upstream");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IDENTITY_MISMATCH",
                    "Player ID mismatch. Please contact an administrator.".to_string(),
                )
            }
            StrikrError::UpstreamUnavailable(e) => {
                error!(error = %e, "Upstream unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_UNAVAILABLE",
                    "The game API is currently unavailable.".to_string(),
                )
            }
            StrikrError::StoreWriteFailure(e) => {
                error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            StrikrError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone())
            }
            StrikrError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            StrikrError::JobAlreadyRunning(_) => {
                (StatusCode::CONFLICT, "JOB_ALREADY_RUNNING", self.to_string())
            }
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}
