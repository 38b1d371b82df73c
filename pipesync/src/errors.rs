//! Error types for reconciliation operations.
//!
//! Every failure a caller can observe falls into one of four kinds (see
//! [`ErrorKind`]): a named resource is absent, an upload conflict could not
//! be cleared, the conflict retry budget ran out, or the remote API failed
//! in some other way.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::core::NotFoundError;

/// The main error type for pipesync operations.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A named resource the operation depends on does not exist.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// The remote reported a version conflict that could not be cleared.
    #[error("Conflict uploading pipeline '{pipeline}' version '{version}': {message}")]
    Conflict {
        /// The pipeline name.
        pipeline: String,
        /// The version display name.
        version: String,
        /// Why the conflict could not be resolved.
        message: String,
    },

    /// Conflict retries were used up without a successful upload.
    #[error("Failed to upload pipeline '{pipeline}' version '{version}' after {attempts} attempts")]
    RetriesExhausted {
        /// The pipeline name.
        pipeline: String,
        /// The version display name.
        version: String,
        /// Total upload attempts made.
        attempts: u32,
    },

    /// The caller supplied an unusable argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any other remote failure (transport, auth, server, bad request).
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Client configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification of a [`ReconcileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A named resource is absent.
    NotFound,
    /// An upload conflict could not be cleared.
    Conflict,
    /// The conflict retry budget was exhausted.
    RetriesExhausted,
    /// Any other remote or local failure.
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::RetriesExhausted => write!(f, "retries_exhausted"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

impl ReconcileError {
    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(
        pipeline: impl Into<String>,
        version: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            pipeline: pipeline.into(),
            version: version.into(),
            message: message.into(),
        }
    }

    /// Creates a retries-exhausted error.
    #[must_use]
    pub fn retries_exhausted(
        pipeline: impl Into<String>,
        version: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self::RetriesExhausted {
            pipeline: pipeline.into(),
            version: version.into(),
            attempts,
        }
    }

    /// Creates an invalid-input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::InvalidInput(_) | Self::Api(_) | Self::Config(_) => ErrorKind::Transport,
        }
    }

    /// Converts to a JSON object suitable for event payloads.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Self::Api(err) = self {
            map.insert("api_kind".to_string(), serde_json::json!(err.kind));
            if let Some(status) = err.status {
                map.insert("status".to_string(), serde_json::json!(status));
            }
        }
        serde_json::Value::Object(map)
    }
}

/// Result type alias for pipesync.
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResourceKind;

    #[test]
    fn test_error_kinds() {
        let not_found: ReconcileError =
            NotFoundError::new(ResourceKind::Pipeline, "P").into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let exhausted = ReconcileError::retries_exhausted("P", "v1", 2);
        assert_eq!(exhausted.kind(), ErrorKind::RetriesExhausted);
        assert!(exhausted.to_string().contains("after 2 attempts"));

        let conflict = ReconcileError::conflict("P", "v1", "no version to replace");
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let api: ReconcileError = ApiError::timeout("deadline elapsed").into();
        assert_eq!(api.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_error_to_json() {
        let err: ReconcileError = ApiError::from_status(503, "unavailable").into();
        let json = err.to_json();

        assert_eq!(json["kind"], "transport");
        assert_eq!(json["api_kind"], "server");
        assert_eq!(json["status"], 503);
    }
}
