//! Typed errors for the module seams.
//!
//! Application-level flow (CLI, data loading, server startup) uses
//! `anyhow`; these enums cover the places where callers branch on the kind
//! of failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;

/// An activity record that violates the item invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("multi-day item '{id}' has no end date")]
    MissingEndDate { id: String },

    #[error("item '{id}' ends on {end} before it starts on {start}")]
    EndBeforeStart {
        id: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),
}

/// Provider configuration problems, detected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// A failed fetch from the calendar provider. Always terminal for the
/// refresh cycle that produced it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to calendar provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("calendar provider rejected the credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("calendar provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid request URL: {0}")]
    Url(String),
}

/// A provider event that cannot be turned into an activity item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("event '{id}' has no {field} time")]
    MissingTime { id: String, field: &'static str },

    #[error("event '{id}' has an invalid {field} time '{value}'")]
    InvalidTime {
        id: String,
        field: &'static str,
        value: String,
    },
}

/// Error returned from JSON API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::BadRequest(msg) => {
                tracing::debug!(details = %msg, "Rejected request");
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg))
            }
            ApiError::Internal(msg) => {
                tracing::error!(details = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
