//! API error types.
//!
//! Every error body has the shape `{"detail": {"code", "message", ...}}`.
//! Conflicts carry the fields a client needs to decide on an override
//! without asking again.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use reclaim_core::guard::{Collision, ConflictDetails, RetryHint};
use reclaim_core::{TrashError, UploadError};
use serde::Serialize;
use std::time::SystemTime;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Correlation id of this refusal. Advisory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensated: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("force delete requires a non-empty override_reason")]
    MissingJustification,

    #[error("already in trash: {0}")]
    AlreadyTrashed(String),

    #[error("{0}")]
    Conflict(Box<ConflictDetails>),

    #[error("{details}")]
    RetentionNotElapsed {
        eligible_at: SystemTime,
        details: Box<ConflictDetails>,
    },

    #[error("{message}")]
    PartialFailure { message: String, compensated: bool },

    #[error("object store unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::MissingJustification => "MISSING_JUSTIFICATION",
            Self::AlreadyTrashed(_) => "ALREADY_TRASHED",
            Self::Conflict(details) => details.code,
            Self::RetentionNotElapsed { details, .. } => details.code,
            Self::PartialFailure { .. } => "PARTIAL_FAILURE",
            Self::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::MissingJustification => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::AlreadyTrashed(_) | Self::Conflict(_) | Self::RetentionNotElapsed { .. } => {
                StatusCode::CONFLICT
            }
            Self::PartialFailure { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn detail(&self) -> ErrorDetail {
        let mut detail = ErrorDetail {
            code: self.code().to_string(),
            message: self.to_string(),
            eligible_at: None,
            version: None,
            token: None,
            retry: None,
            compensated: None,
        };

        let conflict = match self {
            Self::Conflict(details) => Some(details),
            Self::RetentionNotElapsed {
                eligible_at,
                details,
            } => {
                detail.eligible_at = Some(DateTime::<Utc>::from(*eligible_at));
                Some(details)
            }
            Self::PartialFailure { compensated, .. } => {
                detail.compensated = Some(*compensated);
                None
            }
            _ => None,
        };

        if let Some(details) = conflict {
            detail.message = details.message.clone();
            detail.token = Some(details.token.id.to_string());
            detail.retry = details.token.retry;
            if let Collision::VersionExists { version, .. } = &details.collision {
                detail.version = Some(version.clone());
            }
        }
        detail
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            detail: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TrashError> for ApiError {
    fn from(err: TrashError) -> Self {
        let message = err.to_string();
        match err {
            TrashError::NotFound(_) => ApiError::NotFound(message),
            TrashError::AlreadyTrashed(key) => ApiError::AlreadyTrashed(key.to_string()),
            TrashError::Conflict(details) => ApiError::Conflict(details),
            TrashError::RetentionNotElapsed {
                eligible_at,
                details,
            } => ApiError::RetentionNotElapsed {
                eligible_at,
                details,
            },
            TrashError::MissingJustification => ApiError::MissingJustification,
            TrashError::PartialFailure { compensated, .. } => ApiError::PartialFailure {
                message,
                compensated,
            },
            TrashError::UpstreamUnavailable(_) => ApiError::UpstreamUnavailable(message),
            TrashError::Invalid(reason) => ApiError::BadRequest(reason),
            TrashError::Ledger(_) => ApiError::Internal(message),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Conflict(details) => ApiError::Conflict(details),
            UploadError::Invalid(reason) => ApiError::BadRequest(reason),
            UploadError::UpstreamUnavailable(source) => {
                ApiError::UpstreamUnavailable(source.to_string())
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
