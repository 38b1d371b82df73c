//! Opaque identifiers assigned by the remote orchestration system.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! remote_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

remote_id!(
    /// Remote identifier of an experiment.
    ExperimentId
);

remote_id!(
    /// Remote identifier of a pipeline.
    PipelineId
);

remote_id!(
    /// Remote identifier of a single pipeline version.
    PipelineVersionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_as_str() {
        let id = PipelineId::new("4f1c");
        assert_eq!(id.as_str(), "4f1c");
        assert_eq!(id.to_string(), "4f1c");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ExperimentId::from("exp-1");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("exp-1"));

        let parsed: PipelineVersionId = serde_json::from_str("\"ver-9\"").unwrap();
        assert_eq!(parsed, PipelineVersionId::new("ver-9"));
    }
}
