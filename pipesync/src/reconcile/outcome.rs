//! Typed outcomes of reconciliation operations.

use serde::Serialize;

use crate::core::{Experiment, NotFoundError, PipelineVersion, PipelineVersionId};

/// Result of an idempotent get-or-create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "resource", rename_all = "snake_case")]
pub enum EnsureOutcome {
    /// The resource did not exist and was created.
    Created(Experiment),
    /// The resource already existed and was left untouched.
    AlreadyExists(Experiment),
}

impl EnsureOutcome {
    /// Returns the experiment, whether new or pre-existing.
    #[must_use]
    pub fn experiment(&self) -> &Experiment {
        match self {
            Self::Created(e) | Self::AlreadyExists(e) => e,
        }
    }

    /// Returns true if a create call was made.
    #[must_use]
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Result of an idempotent delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome<T> {
    /// The resource existed and was deleted.
    Deleted(T),
    /// Nothing matched; no delete call was made.
    NotFound(NotFoundError),
}

impl<T> RemoveOutcome<T> {
    /// Returns true if a delete call was made.
    #[must_use]
    pub fn was_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }

    /// Returns the deleted resource, if any.
    pub fn deleted(self) -> Option<T> {
        match self {
            Self::Deleted(value) => Some(value),
            Self::NotFound(_) => None,
        }
    }
}

/// Result of a successful version upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// The version as created by the remote.
    pub version: PipelineVersion,
    /// Upload attempts made, including the successful one.
    pub attempts: u32,
    /// Versions deleted to clear conflicts, in deletion order.
    pub replaced: Vec<PipelineVersionId>,
}

impl UploadOutcome {
    /// Returns true if an existing version had to be replaced.
    #[must_use]
    pub fn replaced_existing(&self) -> bool {
        !self.replaced.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResourceKind;

    #[test]
    fn test_ensure_outcome_accessors() {
        let created = EnsureOutcome::Created(Experiment::new("e-1", "nightly"));
        assert!(created.was_created());
        assert_eq!(created.experiment().name, "nightly");

        let existing = EnsureOutcome::AlreadyExists(Experiment::new("e-1", "nightly"));
        assert!(!existing.was_created());
    }

    #[test]
    fn test_ensure_outcome_serializes_tagged() {
        let json = serde_json::to_value(EnsureOutcome::Created(Experiment::new("e-1", "n"))).unwrap();
        assert_eq!(json["outcome"], "created");
        assert_eq!(json["resource"]["experiment_id"], "e-1");
    }

    #[test]
    fn test_remove_outcome_accessors() {
        let deleted: RemoveOutcome<u8> = RemoveOutcome::Deleted(1);
        assert!(deleted.was_deleted());
        assert_eq!(deleted.deleted(), Some(1));

        let missing: RemoveOutcome<u8> =
            RemoveOutcome::NotFound(NotFoundError::new(ResourceKind::Pipeline, "P"));
        assert!(!missing.was_deleted());
        assert_eq!(missing.deleted(), None);
    }
}
