//! Name resolution results.
//!
//! Absence of a named resource is data, not failure: every lookup in the
//! crate returns a [`Resolution`] whose `NotFound` arm carries what was asked
//! for and where.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The kind of remote resource a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// An experiment.
    Experiment,
    /// A pipeline.
    Pipeline,
    /// A pipeline version.
    PipelineVersion,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Experiment => write!(f, "Experiment"),
            Self::Pipeline => write!(f, "Pipeline"),
            Self::PipelineVersion => write!(f, "Pipeline version"),
        }
    }
}

/// A named resource that does not exist on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{kind} '{name}' not found{}{}",
    .scope.as_ref().map(|s| format!(" in '{s}'")).unwrap_or_default(),
    .looking_up.as_ref().map(|l| format!(" while looking up '{l}'")).unwrap_or_default()
)]
pub struct NotFoundError {
    /// What kind of resource was looked up.
    pub kind: ResourceKind,
    /// The queried name.
    pub name: String,
    /// The namespace or parent pipeline the lookup was scoped to.
    pub scope: Option<String>,
    /// The child resource that was being looked up inside the missing one.
    pub looking_up: Option<String>,
}

impl NotFoundError {
    /// Creates a new not-found error.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            scope: None,
            looking_up: None,
        }
    }

    /// Sets the lookup scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Records the child resource whose lookup needed this one.
    #[must_use]
    pub fn while_looking_up(mut self, child: impl Into<String>) -> Self {
        self.looking_up = Some(child.into());
        self
    }
}

/// Outcome of resolving a name to a remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// The resource exists.
    Found(T),
    /// No resource with that name exists.
    NotFound(NotFoundError),
}

impl<T> Resolution<T> {
    /// Returns true if the resource was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns true if the resource was absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns the found value, discarding absence details.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound(_) => None,
        }
    }

    /// Converts into a `Result`, turning absence into an error.
    pub fn into_result(self) -> Result<T, NotFoundError> {
        match self {
            Self::Found(value) => Ok(value),
            Self::NotFound(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_includes_name() {
        let err = NotFoundError::new(ResourceKind::Pipeline, "Unet");
        assert_eq!(err.to_string(), "Pipeline 'Unet' not found");

        let scoped = NotFoundError::new(ResourceKind::PipelineVersion, "v1").with_scope("Unet");
        assert_eq!(scoped.to_string(), "Pipeline version 'v1' not found in 'Unet'");

        let parent = NotFoundError::new(ResourceKind::Pipeline, "p-1").while_looking_up("v1");
        assert_eq!(parent.to_string(), "Pipeline 'p-1' not found while looking up 'v1'");
    }

    #[test]
    fn test_resolution_accessors() {
        let found: Resolution<u32> = Resolution::Found(3);
        assert!(found.is_found());
        assert_eq!(found.clone().found(), Some(3));
        assert_eq!(found.into_result(), Ok(3));

        let missing: Resolution<u32> =
            Resolution::NotFound(NotFoundError::new(ResourceKind::Experiment, "e"));
        assert!(missing.is_not_found());
        assert!(missing.into_result().is_err());
    }
}
