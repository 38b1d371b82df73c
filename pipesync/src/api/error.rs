//! Errors reported by the remote orchestration API.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a remote API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// The addressed resource does not exist (404).
    NotFound,
    /// A resource with the same identity already exists (409).
    Conflict,
    /// Authentication or authorization failed (401, 403).
    Unauthorized,
    /// The request was rejected or could not be built (other 4xx).
    BadRequest,
    /// The server failed (5xx).
    Server,
    /// The request did not complete within the transport timeout.
    Timeout,
    /// Connection-level failure.
    Transport,
    /// The response body could not be understood.
    InvalidResponse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::BadRequest => write!(f, "bad request"),
            Self::Server => write!(f, "server"),
            Self::Timeout => write!(f, "timeout"),
            Self::Transport => write!(f, "transport"),
            Self::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// A failure reported by (or while talking to) the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API {kind} error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
pub struct ApiError {
    /// Failure classification.
    pub kind: ApiErrorKind,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
    /// Server or transport message.
    pub message: String,
}

impl ApiError {
    /// Creates a new API error.
    #[must_use]
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Classifies an HTTP error status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            404 => ApiErrorKind::NotFound,
            409 => ApiErrorKind::Conflict,
            401 | 403 => ApiErrorKind::Unauthorized,
            400..=499 => ApiErrorKind::BadRequest,
            500..=599 => ApiErrorKind::Server,
            _ => ApiErrorKind::InvalidResponse,
        };
        Self::new(kind, message).with_status(status)
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Conflict, message)
    }

    /// Creates a bad-request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadRequest, message)
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transport, message)
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidResponse, message)
    }

    /// Sets the HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true if the remote rejected a creation because the resource
    /// already exists.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind == ApiErrorKind::Conflict
    }

    /// Returns true if the addressed resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_decode() {
            Self::invalid_response(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else if err.is_builder() {
            Self::bad_request(err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert_eq!(ApiError::from_status(404, "").kind, ApiErrorKind::NotFound);
        assert_eq!(ApiError::from_status(409, "").kind, ApiErrorKind::Conflict);
        assert_eq!(ApiError::from_status(401, "").kind, ApiErrorKind::Unauthorized);
        assert_eq!(ApiError::from_status(403, "").kind, ApiErrorKind::Unauthorized);
        assert_eq!(ApiError::from_status(422, "").kind, ApiErrorKind::BadRequest);
        assert_eq!(ApiError::from_status(502, "").kind, ApiErrorKind::Server);
    }

    #[test]
    fn test_only_conflict_is_conflict() {
        assert!(ApiError::conflict("exists").is_conflict());
        assert!(!ApiError::bad_request("invalid pipeline definition").is_conflict());
        assert!(!ApiError::timeout("slow").is_conflict());
    }

    #[test]
    fn test_display_includes_status() {
        let err = ApiError::from_status(409, "already exists");
        assert_eq!(err.to_string(), "API conflict error (status 409): already exists");

        let err = ApiError::transport("connection refused");
        assert_eq!(err.to_string(), "API transport error: connection refused");
    }
}
